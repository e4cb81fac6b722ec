use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "crunch", version, about)]
pub struct Cli {
    /// Configuration file [default: crunch.toml in the platform config directory]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory results are written to (overrides `output_dir`)
    #[arg(long, short, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// Leave the scratch directory on disk when finished
    #[arg(long, global = true)]
    pub keep_scratch: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recompress a single archive
    File(Target),
    /// Recompress every archive directly inside a directory
    Folder(Target),
}

impl Command {
    pub fn target(&self) -> &Target {
        match self {
            Self::File(target) | Self::Folder(target) => target,
        }
    }
}

#[derive(Debug, Args)]
pub struct Target {
    /// Path to process; unquoted words are joined with spaces
    #[arg(required = true, num_args = 1.., value_name = "PATH")]
    words: Vec<String>,
}

impl Target {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["crunch", "file", "mods/example.jar"], "mods/example.jar")]
    #[case(&["crunch", "file", "My", "Mod", "1.0.jar"], "My Mod 1.0.jar")]
    #[case(&["crunch", "folder", "mods", "-o", "out"], "mods")]
    fn test_target_path(#[case] args: &[&str], #[case] expected: &str) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.command.target().path(), PathBuf::from(expected));
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from(["crunch", "folder", "mods", "--output", "out", "--keep-scratch"]).unwrap();
        assert!(matches!(cli.command, Command::Folder(_)));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(cli.keep_scratch);
        assert_eq!(cli.config, None);
    }

    #[rstest]
    #[case(&["crunch"])]
    #[case(&["crunch", "file"])]
    #[case(&["crunch", "zip", "a.jar"])]
    fn test_rejected_invocations(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
