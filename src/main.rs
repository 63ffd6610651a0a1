//! Federated Biometric Client - operator CLI
//!
//! consent [status|on|off|toggle] | model-info | privacy-info

use std::process::ExitCode;
use std::sync::Arc;

use federated_biometric::logic::auth::describe_privacy;
use federated_biometric::logic::consent::ConsentState;
use federated_biometric::logic::transport::{BiometricTransport, HttpTransport, TransportConfig};
use federated_biometric::{constants, BiometricError, ClientConfig, FileStore};

const USAGE: &str = "usage: federated-biometric <consent [status|on|off|toggle] | model-info | privacy-info>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    let config = ClientConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let result = match args.first().map(String::as_str) {
        Some("consent") => match ConsentAction::parse(args.get(1).map(String::as_str)) {
            Some(action) => consent_command(&config, action),
            None => {
                eprintln!("unknown consent action '{}'\n{}", args.get(1).map_or("", String::as_str), USAGE);
                return ExitCode::from(2);
            }
        },
        Some("model-info") => model_info_command(&config).await,
        Some("privacy-info") => {
            println!("{}", describe_privacy(&config.privacy));
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsentAction {
    Status,
    On,
    Off,
    Toggle,
}

impl ConsentAction {
    /// No action means `status`
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("status") {
            "status" => Some(Self::Status),
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

fn consent_command(config: &ClientConfig, action: ConsentAction) -> Result<(), BiometricError> {
    let store = Arc::new(FileStore::open(config.store_path())?);
    let consent = ConsentState::new(store);

    let granted = match action {
        ConsentAction::Status => consent.get(),
        ConsentAction::On => {
            consent.set(true)?;
            true
        }
        ConsentAction::Off => {
            consent.set(false)?;
            false
        }
        ConsentAction::Toggle => consent.toggle()?,
    };

    println!("Federated training {}", if granted { "enabled" } else { "disabled" });
    Ok(())
}

async fn model_info_command(config: &ClientConfig) -> Result<(), BiometricError> {
    let transport = HttpTransport::new(TransportConfig::from(config))?;
    let info = transport.model_info().await?;
    println!("Federated model version: {}", info.version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_action_parse() {
        assert_eq!(ConsentAction::parse(None), Some(ConsentAction::Status));
        assert_eq!(ConsentAction::parse(Some("on")), Some(ConsentAction::On));
        assert_eq!(ConsentAction::parse(Some("off")), Some(ConsentAction::Off));
        assert_eq!(ConsentAction::parse(Some("toggle")), Some(ConsentAction::Toggle));
    }

    #[test]
    fn test_unknown_consent_action_rejected() {
        assert_eq!(ConsentAction::parse(Some("maybe")), None);
        assert_eq!(ConsentAction::parse(Some("")), None);
    }
}
