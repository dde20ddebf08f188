use colored::Colorize;
use drupal_launcher_cloud::{CloudError, CloudProvider, HealthProber, HealthReport};
use drupal_launcher_config::LauncherConfig;

/// Returns whether the site answered as expected.
pub async fn handle<P: CloudProvider>(
    config: &LauncherConfig,
    provider: &P,
) -> anyhow::Result<bool> {
    let prober = HealthProber::new(
        provider,
        &config.web_stack_pattern,
        config.web_server_resource.clone(),
    )?;

    match prober.check().await {
        Ok(HealthReport::Up { .. }) => {
            println!("{}", "The site is up.".green());
            Ok(true)
        }
        Ok(HealthReport::Down { .. }) => {
            println!("{}", "The site is down!".red().bold());
            Ok(false)
        }
        Err(CloudError::StackNotFound(message)) | Err(CloudError::ResourceNotFound(message)) => {
            println!("{}.", message.yellow());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
