use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "appzip")]
#[command(version)]
#[command(about = "Package an app build and its static web assets into a single zip", long_about = None)]
#[command(after_help = "Examples:\n  \
  appzip App.csproj -o bin/package -d obj/publish/dist        build bin/package/App.zip\n  \
  appzip App.csproj -o out -d dist -l                         also list the archive contents\n  \
  appzip App.csproj -o out -d dist --verify -q                check every entry, print nothing")]
pub struct Cli {
    /// Project file (.csproj); its name names the artifact
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Directory receiving <name>.zip
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: String,

    /// Published dist directory to package
    #[arg(short = 'd', long = "dist", value_name = "DIR")]
    pub dist: String,

    /// List archive contents after packaging
    #[arg(short = 'l')]
    pub list: bool,

    /// Re-read the archive and check every entry's CRC
    #[arg(long)]
    pub verify: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        if self.quiet > 1 {
            return "off";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "appzip", "App.csproj", "-o", "out", "-d", "dist", "-l", "-vv",
        ])
        .unwrap();

        assert_eq!(cli.project, PathBuf::from("App.csproj"));
        assert_eq!(cli.output, "out");
        assert_eq!(cli.dist, "dist");
        assert!(cli.list);
        assert!(!cli.verify);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn double_quiet_silences_logging() {
        let cli = Cli::try_parse_from([
            "appzip", "App.csproj", "--output", "out", "--dist", "dist", "-qq", "-v",
        ])
        .unwrap();

        assert!(cli.is_quiet());
        assert_eq!(cli.log_level(), "off");
    }

    #[test]
    fn output_and_dist_are_required() {
        assert!(Cli::try_parse_from(["appzip", "App.csproj", "-o", "out"]).is_err());
        assert!(Cli::try_parse_from(["appzip", "App.csproj", "-d", "dist"]).is_err());
    }
}
