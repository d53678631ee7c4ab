// SPDX-License-Identifier: MPL-2.0
use media_browser::app::{self, Flags};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
media_browser - folder tree with an image and video preview pane

USAGE:
  media_browser [OPTIONS] [PATH]

ARGS:
  <PATH>                  Directory or media file to open on startup

OPTIONS:
  -h, --help              Print this help and exit
      --lang <LOCALE>     UI language (e.g. en-US, zh-CN)
      --config-dir <DIR>  Directory holding settings.toml

ENVIRONMENT:
  MEDIA_BROWSER_CONFIG_DIR  Config directory when --config-dir is not given
  RUST_LOG                  Log filter (default: info,wgpu=warn,naga=warn)
";

fn parse_args() -> Result<Option<Flags>, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let lang = args.opt_value_from_str("--lang")?;
    let config_dir = args.opt_value_from_str("--config-dir")?;
    let path = args
        .finish()
        .into_iter()
        .next()
        .and_then(|s| s.into_string().ok());

    Ok(Some(Flags {
        lang,
        path,
        config_dir,
    }))
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wgpu=warn,naga=warn")),
        )
        .init();

    let flags = match parse_args() {
        Ok(Some(flags)) => flags,
        Ok(None) => {
            print!("{HELP}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    app::run(flags)
}
