#![warn(clippy::unwrap_used)]

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use invoicr::{
    builder::InvoiceBuilder,
    configuration::InvoiceConfiguration,
    delivery::{Delivery as _, DirectoryDelivery},
    error::InvoiceError,
    form::FormSnapshot,
    logo::{DefaultFetcher, LogoReference},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    #[arg(long = "form", help = "Path to the form snapshot in the JSON format")]
    form_path: PathBuf,
    #[arg(
        long = "configuration",
        help = "Path to the configuration file in the JSON format, the defaults are used otherwise"
    )]
    configuration_path: Option<PathBuf>,
    #[arg(
        long = "output",
        default_value = ".",
        help = "Directory into which the document is saved"
    )]
    output_directory: PathBuf,
    #[arg(
        long = "logo",
        help = "Logo to use instead of the one of the form: a file path, an URL or a data URI"
    )]
    logo: Option<String>,
    #[arg(
        long = "transcript",
        help = "Print what would be drawn instead of saving the document"
    )]
    transcript: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), InvoiceError> {
    let cli_arguments = CliArguments::parse();

    let configuration = match &cli_arguments.configuration_path {
        Some(configuration_path) => InvoiceConfiguration::from_path(configuration_path)?,
        None => InvoiceConfiguration::default(),
    };
    let mut form = FormSnapshot::from_path(&cli_arguments.form_path)?.into_form()?;
    if let Some(logo) = &cli_arguments.logo {
        match logo.parse::<LogoReference>() {
            Ok(logo) => form.set_logo(logo),
            Err(never) => match never {},
        }
    }

    let fetcher = DefaultFetcher::new(Duration::from_secs(configuration.fetch_timeout_seconds));
    let builder = InvoiceBuilder::new(configuration);

    if cli_arguments.transcript {
        let request = form.snapshot_with_logo(&fetcher);
        print!("{}", builder.transcript(&request)?);
        return Ok(());
    }

    let document = form.generate(&builder, &fetcher)?;
    let document_path = DirectoryDelivery::new(&cli_arguments.output_directory).deliver(&document)?;
    println!("{}", document_path.display());

    Ok(())
}
