use std::process::ExitCode;

use esim_storefront::devices::group_devices;
use esim_storefront::format::{country_flag, format_price};
use esim_storefront::telemetry::init_tracing;
use esim_storefront::{Client, Language, StorefrontConfig, StorefrontError, Translator};

const USAGE: &str = "usage: esim-catalog [--lang <code>] <countries|regions|devices|page <slug>>";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let mut args = pico_args::Arguments::from_env();
    let lang: Option<Language> = match args.opt_value_from_str("--lang") {
        Ok(lang) => lang,
        Err(err) => {
            eprintln!("{}\n{}", err, USAGE);
            return ExitCode::FAILURE;
        }
    };
    let rest: Vec<String> = args
        .finish()
        .into_iter()
        .filter_map(|s| s.into_string().ok())
        .collect();

    match run(lang, &rest).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "esim-catalog failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(lang: Option<Language>, args: &[String]) -> Result<(), StorefrontError> {
    let config = StorefrontConfig::from_env_or_toml()?;
    let language = lang
        .or(config.language)
        .or_else(Language::detect)
        .unwrap_or_default();
    let t = Translator::new(language);
    let client = Client::new(&config)?;

    match args.first().map(String::as_str) {
        Some("countries") => {
            println!("{}", t.t("catalog.countries", &[]));
            for country in client.countries().await?.data {
                let from = country
                    .starting_price
                    .map(|price| t.t("catalog.starting_from", &[("price", &format_price(price, "USD"))]))
                    .unwrap_or_default();
                println!("{} {} {}", country.flag(), country.name, from);
            }
        }
        Some("regions") => {
            println!("{}", t.t("catalog.regions", &[]));
            for region in client.regions().await?.data {
                let flags: String = region
                    .countries
                    .iter()
                    .map(|c| country_flag(c.code.as_deref().unwrap_or_default()))
                    .collect();
                println!("{} ({} packages) {}", region.name, region.packages.len(), flags);
            }
        }
        Some("devices") => {
            println!("{}", t.t("devices.title", &[]));
            let devices = client.compatible_devices().await?.data;
            for group in group_devices(&devices) {
                println!("{}", t.t(group.category.label_key(), &[]));
                for brand in group.brands {
                    println!("  {}: {}", brand.brand, brand.models.join(", "));
                }
            }
        }
        Some("page") => {
            let slug = args
                .get(1)
                .ok_or_else(|| StorefrontError::InvalidInput(USAGE.to_string()))?;
            let page = client.page(slug).await?.data;
            println!("{}\n\n{}", page.title, page.content);
        }
        _ => return Err(StorefrontError::InvalidInput(USAGE.to_string())),
    }

    Ok(())
}
