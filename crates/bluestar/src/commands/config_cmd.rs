//! Config subcommand handlers.

use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, config_path, load_config_or_default};
use crate::error::CliError;
use crate::output;

#[derive(Clone, serde::Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Host")]
    base_url: String,
    #[tabled(rename = "Active")]
    active: String,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config_or_default();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    bluestar_config::to_redacted_toml(&cfg)?
                }
                _ => output::render_single(
                    &global.output,
                    &bluestar_config::redacted(&cfg),
                    |_| String::new(),
                    |_| String::new(),
                )?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = load_config_or_default();
            let (active, _) = config::selected_profile(global, &cfg)?;
            let rows: Vec<ProfileRow> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileRow {
                    name: name.clone(),
                    phone: p.phone.clone().unwrap_or_else(|| "-".into()),
                    base_url: p
                        .base_url
                        .clone()
                        .unwrap_or_else(|| bluestar_config::DEFAULT_BASE_URL.into()),
                    active: if *name == active { "*".into() } else { String::new() },
                })
                .collect();
            let out = output::render_list(&global.output, &rows, Clone::clone, |r| r.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
