//! Where the ordered phase list for a run comes from.

use crate::config::Phase;
use crate::{AgentPipeError, Result};

/// Supplies the ordered phase list a pipeline run selects from. Kept
/// behind a trait since phases commonly come from a tracker file a
/// surrounding tool maintains, not from agentpipe itself.
pub trait PhaseSource: Send + Sync {
    fn phases(&self) -> Result<Vec<Phase>>;
}

/// Reads phases from pipe-separated lines: `<id>|<name>|<start_task>|<end_task>`.
/// Blank lines and lines starting with `#` are skipped.
pub struct PipeSeparatedPhaseSource {
    contents: String,
}

impl PipeSeparatedPhaseSource {
    pub fn new(contents: impl Into<String>) -> Self {
        Self { contents: contents.into() }
    }

    fn parse_line(line: &str) -> Result<Phase> {
        let fields: Vec<&str> = line.splitn(4, '|').collect();
        if fields.len() != 4 {
            return Err(AgentPipeError::InvalidName(format!(
                "expected 4 pipe-separated fields, got {}: {line:?}",
                fields.len()
            )));
        }
        let id = fields[0].trim().parse::<u64>().map_err(|_| {
            AgentPipeError::InvalidName(format!("phase id is not a number: {:?}", fields[0]))
        })?;
        Ok(Phase {
            id,
            name: fields[1].trim().to_string(),
            start_task: fields[2].trim().to_string(),
            end_task: fields[3].trim().to_string(),
        })
    }
}

impl PhaseSource for PipeSeparatedPhaseSource {
    fn phases(&self) -> Result<Vec<Phase>> {
        self.contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Self::parse_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_lines() {
        let source = PipeSeparatedPhaseSource::new(
            "1|Phase One|implement the thing|done\n2|Phase Two|review it|reviewed\n",
        );
        let phases = source.phases().unwrap();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].id, 1);
        assert_eq!(phases[1].name, "Phase Two");
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let source = PipeSeparatedPhaseSource::new("\n# a comment\n1|Phase One|start|end\n\n");
        let phases = source.phases().unwrap();
        assert_eq!(phases.len(), 1);
    }

    #[test]
    fn malformed_line_is_an_error() {
        let source = PipeSeparatedPhaseSource::new("1|only two fields");
        assert!(source.phases().is_err());
    }

    #[test]
    fn empty_input_yields_an_empty_list() {
        let source = PipeSeparatedPhaseSource::new("");
        assert_eq!(source.phases().unwrap().len(), 0);
    }
}
