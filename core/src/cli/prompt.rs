use crate::error::Result;
use crate::reconcile::{ReconciliationAnswer, ReconciliationPrompt, ReconciliationRequest};
use crate::types::StructureLabel;
use log::warn;
use std::io::{BufRead, Write};

/// Asks for missing labels and volumes on a terminal
///
/// For every prescription label with no same-named DVH structure, the
/// user types the DVH label to use (blank skips the structure). For every
/// label missing a volume, the user types it in cc (blank leaves it
/// unset). End of input means no answer.
pub struct InteractivePrompt<R, W> {
    input: R,
    output: W,
}

impl InteractivePrompt<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Prompt reading stdin and writing questions to stderr
    pub fn terminal() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> InteractivePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes `question` and reads one trimmed line, `None` at end of input
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_label(
        &mut self,
        label: &StructureLabel,
        dvh_labels: &[StructureLabel],
    ) -> Result<Option<Option<StructureLabel>>> {
        loop {
            let Some(reply) = self.ask(&format!("DVH structure for {} (blank to skip): ", label))?
            else {
                return Ok(None);
            };
            if reply.is_empty() {
                return Ok(Some(None));
            }
            let chosen = StructureLabel::new(&reply);
            if dvh_labels.contains(&chosen) {
                return Ok(Some(Some(chosen)));
            }
            writeln!(self.output, "  {} is not in the DVH", chosen)?;
        }
    }

    fn ask_volume(&mut self, label: &StructureLabel) -> Result<Option<Option<f64>>> {
        loop {
            let Some(reply) = self.ask(&format!("Volume of {} in cc (blank to skip): ", label))?
            else {
                return Ok(None);
            };
            if reply.is_empty() {
                return Ok(Some(None));
            }
            match reply.replace(',', ".").parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => return Ok(Some(Some(v))),
                _ => writeln!(self.output, "  '{}' is not a positive number", reply)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ReconciliationPrompt for InteractivePrompt<R, W> {
    fn resolve(&mut self, request: &ReconciliationRequest) -> Result<Option<ReconciliationAnswer>> {
        writeln!(
            self.output,
            "DVH structures: {}",
            request
                .dvh_labels
                .iter()
                .map(StructureLabel::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )?;

        let mut answer = ReconciliationAnswer::default();
        for label in &request.prescription_labels {
            if request.needs_match(label) {
                match self.ask_label(label, &request.dvh_labels)? {
                    None => return Ok(None),
                    Some(Some(dvh_label)) => {
                        answer.label_map.insert(label.clone(), dvh_label);
                    }
                    Some(None) => {
                        warn!("{} skipped by user", label);
                        answer.ignored.insert(label.clone());
                        continue;
                    }
                }
            }
            if request.needs_volume(label) {
                match self.ask_volume(label)? {
                    None => return Ok(None),
                    Some(Some(volume)) => {
                        answer.volumes.insert(label.clone(), volume);
                    }
                    Some(None) => {}
                }
            }
        }
        Ok(Some(answer))
    }
}

/// Answers from a JSON mapping file instead of asking
///
/// The file holds a serialized [`ReconciliationAnswer`]:
///
/// ```json
/// {"label_map": {"RECTUM": "RECTO"}, "volumes": {"RECTUM": 72.5}, "ignored": []}
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone)]
pub struct MappingFilePrompt {
    path: std::path::PathBuf,
}

#[cfg(feature = "json")]
impl MappingFilePrompt {
    pub fn new<P: Into<std::path::PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "json")]
impl ReconciliationPrompt for MappingFilePrompt {
    fn resolve(&mut self, _request: &ReconciliationRequest) -> Result<Option<ReconciliationAnswer>> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}
