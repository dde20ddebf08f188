use crate::commands::{cancel_on_interrupt, prompt};
use crate::progress::LaunchProgress;
use colored::Colorize;
use drupal_launcher_cloud::{CloudError, CloudProvider, KeyPairState, Launcher};
use drupal_launcher_config::LauncherConfig;

pub async fn handle<P: CloudProvider>(
    config: &LauncherConfig,
    provider: &P,
    email: Option<String>,
) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("Creating the Drupal stack in {}", provider.region())
            .green()
            .bold()
    );

    let progress = LaunchProgress::new();
    let launcher = Launcher::new(provider, config).with_cancellation(cancel_on_interrupt());

    // マスタースタック完了後にだけ呼ばれる
    let resolve_email = move || -> drupal_launcher_cloud::Result<String> {
        if let Some(email) = email {
            println!("Using alert email: {}", email.cyan());
            return Ok(email);
        }
        loop {
            let email = prompt("Enter alert email: ").map_err(CloudError::from)?;
            if !email.is_empty() {
                return Ok(email);
            }
        }
    };

    let report = launcher.create(resolve_email, &progress).await?;

    println!();
    println!(
        "Bucket: {}{}",
        report.bucket.name.cyan(),
        if report.bucket.created { " (created)" } else { "" }
    );
    if report.key_pair == KeyPairState::Created {
        let key_path = config.key_pair_path()?;
        println!("Created new private key file at: {}", key_path.display());
    }
    println!(
        "Puppet Master stack: {} ({})",
        report.master.handle.status, report.master.action
    );
    println!(
        "Drupal stack: {} ({})",
        report.client.handle.status, report.client.action
    );

    println!();
    for (key, value) in report.outputs() {
        println!("{} is {}", key.bold(), value);
    }
    println!("{}", "✓ Drupal stack is ready".green().bold());

    Ok(())
}
