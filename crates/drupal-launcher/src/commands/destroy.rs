use crate::commands::{cancel_on_interrupt, confirm};
use crate::progress::LaunchProgress;
use colored::Colorize;
use drupal_launcher_cloud::{CloudProvider, KeyPairRemoval, Launcher};
use drupal_launcher_config::LauncherConfig;

pub async fn handle<P: CloudProvider>(
    config: &LauncherConfig,
    provider: &P,
    yes: bool,
) -> anyhow::Result<()> {
    if !yes
        && !confirm(
            "Are you sure you want to destroy your Drupal install? This operation cannot be undone!",
        )?
    {
        println!("Aborted.");
        return Ok(());
    }

    println!(
        "{}",
        format!("Destroying the Drupal stack in {}", provider.region())
            .yellow()
            .bold()
    );

    let progress = LaunchProgress::new();
    let launcher = Launcher::new(provider, config).with_cancellation(cancel_on_interrupt());
    let report = launcher.destroy(&progress).await?;

    println!();
    for (label, handle) in [
        (&config.client_stack.name, &report.client),
        (&config.master_stack.name, &report.master),
    ] {
        match handle {
            Some(_) => println!("  ✓ Stack {} deleted", label),
            None => println!("  ℹ Stack {} not found", label),
        }
    }
    match &report.bucket {
        Some(name) => println!("  ✓ Bucket {} deleted", name),
        None => println!("  ℹ No bucket found"),
    }

    let key_path = config.key_pair_path()?;
    match report.key_pair {
        KeyPairRemoval::Removed => println!(
            "  ✓ Key pair {} and {} deleted",
            config.key_pair_name,
            key_path.display()
        ),
        KeyPairRemoval::RemoteRemoved => {
            println!("  ✓ Key pair {} deleted", config.key_pair_name)
        }
        KeyPairRemoval::LocalOrphanKept => println!(
            "  {} The private key found at {} does not seem to have a public mate on this account. Skipping.",
            "⚠".yellow(),
            key_path.display()
        ),
        KeyPairRemoval::NotFound => println!("  ℹ No key pairs found"),
    }

    println!("{}", "✓ Teardown complete".green().bold());
    Ok(())
}
