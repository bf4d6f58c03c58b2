//! Config command - manage configuration.

use std::path::Path;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use crate::config::ToolhubConfig;
use crate::types::{Feature, Tier};

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub command: ConfigSubCmd,
}

#[derive(Subcommand)]
pub enum ConfigSubCmd {
    /// Show current configuration (secrets are not printed)
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with every default filled in
    Init(InitCmd),

    /// Set the shared secret for /api/cron/reset-usage
    SetCronSecret(SetCronSecretCmd),

    /// Map a payment-provider plan id to a tier
    SetPlan(SetPlanCmd),

    /// Set the daily limit for one feature and tier
    SetLimit(SetLimitCmd),
}

#[derive(Args)]
pub struct InitCmd {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SetCronSecretCmd {
    pub secret: String,
}

#[derive(Args)]
pub struct SetPlanCmd {
    /// Plan id (e.g., price_1Pro...)
    pub plan_id: String,

    #[arg(value_enum)]
    pub tier: Tier,
}

#[derive(Args)]
pub struct SetLimitCmd {
    #[arg(value_enum)]
    pub feature: Feature,

    #[arg(value_enum)]
    pub tier: Tier,

    /// Uses per UTC day
    pub limit: u32,
}

impl ConfigCmd {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => ToolhubConfig::config_path()?,
        };

        match &self.command {
            ConfigSubCmd::Show => {
                let config = ToolhubConfig::load(Some(&path))?;
                show(&config, &path);
            }
            ConfigSubCmd::Path => {
                println!("{}", path.display());
            }
            ConfigSubCmd::Init(cmd) => {
                if path.exists() && !cmd.force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                ToolhubConfig::default().save(Some(&path))?;
                println!("Wrote {}", path.display());
            }
            ConfigSubCmd::SetCronSecret(cmd) => {
                if cmd.secret.trim().is_empty() {
                    bail!("Cron secret must not be empty");
                }
                let mut config = ToolhubConfig::load(Some(&path))?;
                config.cron_secret = Some(cmd.secret.clone());
                config.save(Some(&path))?;
                println!("Cron secret saved.");
            }
            ConfigSubCmd::SetPlan(cmd) => {
                let mut config = ToolhubConfig::load(Some(&path))?;
                config.plans.insert(cmd.plan_id.clone(), cmd.tier);
                config.save(Some(&path))?;
                println!("Plan {} -> {}", cmd.plan_id, cmd.tier);
            }
            ConfigSubCmd::SetLimit(cmd) => {
                let mut config = ToolhubConfig::load(Some(&path))?;
                config
                    .limits
                    .entry(cmd.feature.as_str().to_string())
                    .or_default()
                    .insert(cmd.tier.as_str().to_string(), cmd.limit);
                // Refuse to save a table the server would reject at startup
                config.limit_table()?;
                config.save(Some(&path))?;
                println!("{} ({}): {} per day", cmd.feature, cmd.tier, cmd.limit);
            }
        }
        Ok(())
    }
}

fn set_or_not(value: &Option<String>) -> &'static str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => "(set)",
        _ => "(not set)",
    }
}

fn show(config: &ToolhubConfig, path: &Path) {
    println!("Config: {}", path.display());
    println!();
    println!("database_path:  {}", config.database_path.display());
    println!("bind_addr:      {}", config.bind_addr);
    println!("cron_secret:    {}", set_or_not(&config.cron_secret));
    println!("reset_policy:   {}", config.reset_policy);

    println!();
    println!("Plans:");
    for (plan_id, tier) in &config.plans {
        println!("  {:<24} {}", plan_id, tier);
    }

    println!();
    println!("{:<16} {:>6} {:>6} {:>6}", "LIMITS", "FREE", "PRO", "MASTER");
    for (feature, tiers) in &config.limits {
        let cell = |tier: Tier| {
            tiers
                .get(tier.as_str())
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{:<16} {:>6} {:>6} {:>6}",
            feature,
            cell(Tier::Free),
            cell(Tier::Pro),
            cell(Tier::Master)
        );
    }

    let providers = &config.providers;
    println!();
    println!("Providers:");
    println!("  groq_api_key:        {}", set_or_not(&providers.groq_api_key));
    println!("  groq_base_url:       {}", providers.groq_base_url);
    println!("  chat_model:          {}", providers.chat_model);
    println!("  rapidapi_key:        {}", set_or_not(&providers.rapidapi_key));
    println!("  detector_host:       {}", providers.detector_host);
    println!("  seo_host:            {}", providers.seo_host);
    println!("  judge0_host:         {}", providers.judge0_host);
    println!("  elevenlabs_api_key:  {}", set_or_not(&providers.elevenlabs_api_key));
    println!("  voice_id:            {}", providers.voice_id);
    println!("  tinyurl_api_token:   {}", set_or_not(&providers.tinyurl_api_token));
    println!("  timeout_secs:        {}", providers.timeout_secs);
}
