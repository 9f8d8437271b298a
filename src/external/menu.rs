use std::{
    io::{self, Read, Write},
    process::{ChildStdin, Command, Stdio},
    thread,
};

#[cfg(test)]
use mockall::automock;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SelectionFailed {
    #[error("menu command is empty")]
    NoProgram,
    #[error("cannot talk to the menu: {0}")]
    Io(#[from] std::io::Error),
    #[error("menu exited with {0}")]
    Exit(std::process::ExitStatus),
}

/// Lets the user pick a line out of `candidates`.
#[cfg_attr(test, automock)]
pub trait Selector {
    fn select(&self, candidates: &[String]) -> Result<String, SelectionFailed>;
}

/// Runs an interactive menu like `rofi -dmenu` or `dmenu`. Candidates go to its stdin, one per
/// line, and the selection is read from stdout.
pub struct MenuCommand {
    program: String,
    args: Vec<String>,
}

impl MenuCommand {
    pub const DEFAULT: &'static str = "rofi -dmenu";

    /// Splits a command line on whitespace.
    pub fn parse(command: &str) -> Result<Self, SelectionFailed> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(SelectionFailed::NoProgram)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Selector for MenuCommand {
    fn select(&self, candidates: &[String]) -> Result<String, SelectionFailed> {
        debug!(
            "Running {} with {} candidates",
            self.program,
            candidates.len()
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let selected = thread::scope(|scope| -> io::Result<String> {
            // Candidates are written while the selection is read, a menu may answer before it has
            // seen the whole list. Stdin is dropped once written, which ends the list.
            let writer = scope.spawn(move || write_candidates(stdin, candidates));
            let mut selected = String::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_string(&mut selected)?;
            }
            writer
                .join()
                .map_err(|_| io::Error::other("writing candidates panicked"))??;
            Ok(selected)
        })?;

        let status = child.wait()?;
        if !status.success() {
            return Err(SelectionFailed::Exit(status));
        }
        Ok(selected.trim().to_string())
    }
}

/// A menu that exits before reading every candidate closes the pipe, that's not an error.
fn write_candidates(stdin: Option<ChildStdin>, candidates: &[String]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    for candidate in candidates {
        match writeln!(stdin, "{candidate}") {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            result => result?,
        }
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::{MenuCommand, SelectionFailed, Selector};

    #[test]
    fn test_menu_reads_selection() {
        let menu = MenuCommand::parse("sed -n 1p").unwrap();
        let selected = menu
            .select(&["writing".to_string(), "reading".to_string()])
            .unwrap();
        assert_eq!(selected, "writing");
    }

    #[test]
    fn test_menu_may_answer_before_reading_all_candidates() {
        let candidates = (0..100_000)
            .map(|i| format!("activity number {i}"))
            .collect::<Vec<_>>();
        let menu = MenuCommand::parse("head -n 1").unwrap();

        assert_eq!(menu.select(&candidates).unwrap(), "activity number 0");
    }

    #[test]
    fn test_menu_runs_without_candidates() {
        let menu = MenuCommand::parse("cat").unwrap();
        assert_eq!(menu.select(&[]).unwrap(), "");
    }

    #[test]
    fn test_menu_failure() {
        let menu = MenuCommand::parse("false").unwrap();
        assert!(matches!(menu.select(&[]), Err(SelectionFailed::Exit(_))));
        assert!(matches!(
            MenuCommand::parse("  "),
            Err(SelectionFailed::NoProgram)
        ));
    }
}
