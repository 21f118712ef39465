use classpatch::patch::Patcher;

use clap::{crate_version, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process;

mod archive;
mod config;
mod error;
mod key;

use config::Config;
use error::Error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("Client class patcher")
        .version(crate_version!())
        .about("Deobfuscate a client JAR, replace its login key, and rename its classes")
        .arg(
            Arg::new("src")
                .long("src")
                .value_name("JAR")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("The source jar"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("JAR")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("The output jar"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("JSON")
                .default_value("patcher.json")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Patcher configuration"),
        )
        .arg(
            Arg::new("key-url")
                .long("key-url")
                .value_name("URL")
                .help("Download the login public key (DER, X.509) instead of using a private key"),
        )
        .arg(
            Arg::new("private-key")
                .long("private-key")
                .value_name("DER")
                .default_value("login-private-key.der")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Login private key (DER, PKCS#8), generated if missing"),
        )
        .arg(
            Arg::new("no-verify")
                .long("no-verify")
                .action(ArgAction::SetTrue)
                .help("Skip type-checking the patched methods"),
        )
        .get_matches();

    let options = Options {
        src: matches.get_one::<PathBuf>("src").cloned().unwrap_or_default(),
        out: matches.get_one::<PathBuf>("out").cloned().unwrap_or_default(),
        config: matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_default(),
        key_url: matches.get_one::<String>("key-url").cloned(),
        private_key: matches
            .get_one::<PathBuf>("private-key")
            .cloned()
            .unwrap_or_default(),
        verify: !matches.get_flag("no-verify"),
    };

    if let Err(err) = run(options) {
        log::error!("{}", err);
        process::exit(1);
    }
}

struct Options {
    src: PathBuf,
    out: PathBuf,
    config: PathBuf,
    key_url: Option<String>,
    private_key: PathBuf,
    verify: bool,
}

fn run(options: Options) -> Result<(), Error> {
    if !options.src.exists() {
        log::error!("Could not find src jar {}", options.src.display());
        return Ok(());
    }

    let config = Config::load(&options.config)?;
    let public_key = match &options.key_url {
        Some(url) => key::download(url)?,
        None => key::load_or_generate(&options.private_key)?,
    };
    let mut settings = config.into_settings(public_key)?;
    settings.verify &= options.verify;

    let class_files = archive::read_classes(&options.src)?;
    let output = Patcher::new(settings).patch(class_files)?;
    archive::write_classes(&options.out, &output.classes)?;
    Ok(())
}
