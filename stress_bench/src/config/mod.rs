use std::path::Path;

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing,
};

use influx_stress_lib::{Precision, Scheme, TargetConfig};

mod date;

pub use self::date::{InvalidDate, parse_date};

/// Target properties that can be defined on the command line.
///
/// Every defined property overwrites the one of the config file.
#[derive(Debug, Clone, clap::Args, Default)]
pub struct TargetArgs {
    /// http or https
    #[arg(long, global = true)]
    pub scheme: Option<Scheme>,

    /// host name or ip of the store under test
    #[arg(long, global = true)]
    pub host: Option<String>,

    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// database written to and queried from
    #[arg(long = "db", global = true)]
    pub database: Option<String>,

    /// timestamp precision (only `ms` is supported)
    #[arg(long, global = true)]
    pub precision: Option<Precision>,

    /// extra header sent with every request, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header, global = true)]
    pub headers: Vec<(String, String)>,

    /// per request timeout (<= 0.0 = wait forever)
    #[arg(long, value_name = "SECONDS", global = true)]
    pub request_timeout: Option<f64>,

    /// seed payload generation, for reproducible payloads
    #[arg(long, value_name = "N", global = true)]
    pub seed: Option<u64>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("header '{s}' is not of the form NAME:VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header '{s}' has an empty name"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

/// Load the config file (if any) and apply the command line overwrites on top of it.
pub async fn resolve_target_config(
    path: Option<&Path>,
    overwrite: TargetArgs,
) -> Result<TargetConfig, BoxError> {
    let base = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "use config file to define base config");
            load_config_file(path).await?
        }
        None => {
            tracing::info!("no config file defined, use default as base config");
            TargetConfig::default()
        }
    };
    Ok(merge_target_config(base, overwrite))
}

async fn load_config_file(path: &Path) -> Result<TargetConfig, BoxError> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("read config file {}", path.display()))?;
    let config = serde_json::from_slice(&raw)
        .with_context(|| format!("json-decode config file {}", path.display()))?;
    Ok(config)
}

fn merge_target_config(base: TargetConfig, overwrite: TargetArgs) -> TargetConfig {
    macro_rules! merge_config {
        (
            $base:ident, $overwrite:ident,
            {$($property:ident),+ $(,)?},
            optional: {$($optional:ident),+ $(,)?},
            extend: {$($map:ident),+ $(,)?} $(,)?
        ) => {
            TargetConfig {
                $(
                    $property: if let Some(value) = $overwrite.$property {
                        tracing::info!("property '{}': use overwrite: {value}", stringify!($property));
                        value
                    } else {
                        tracing::info!("property '{}': use base: {}", stringify!($property), $base.$property);
                        $base.$property
                    },
                )+
                $(
                    $optional: if let Some(value) = $overwrite.$optional {
                        tracing::info!("property '{}': use overwrite: {value}", stringify!($optional));
                        Some(value)
                    } else if let Some(value) = $base.$optional {
                        tracing::info!("property '{}': use base: {value}", stringify!($optional));
                        Some(value)
                    } else {
                        tracing::info!("property '{}': undefined", stringify!($optional));
                        None
                    },
                )+
                $(
                    $map: {
                        let mut map = $base.$map;
                        for (key, value) in $overwrite.$map {
                            tracing::info!("property '{}': use overwrite for key '{key}'", stringify!($map));
                            map.insert(key, value);
                        }
                        map
                    },
                )+
            }
        };
    }

    merge_config!(
        base, overwrite,
        {
            scheme,
            host,
            port,
            database,
            precision,
        },
        optional: {
            request_timeout,
            seed,
        },
        extend: {
            headers,
        },
    )
}
