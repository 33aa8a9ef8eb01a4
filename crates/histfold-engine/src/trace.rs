use similar::TextDiff;

use histfold_contracts::history::Message;

#[derive(Debug, Clone, PartialEq)]
pub struct StageTrace {
    pub stage: String,
    pub message_count: usize,
    /// Unified diff of the rendered history; empty when the stage changed nothing.
    pub diff: Vec<String>,
}

impl StageTrace {
    pub fn changed(&self) -> bool {
        !self.diff.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineTrace {
    pub stages: Vec<StageTrace>,
}

impl PipelineTrace {
    pub fn record(&mut self, stage: &str, before: &[Message], after: &[Message]) {
        self.stages.push(StageTrace {
            stage: stage.to_string(),
            message_count: after.len(),
            diff: history_diff(&render_history(before), &render_history(after)),
        });
    }

    pub fn stage(&self, name: &str) -> Option<&StageTrace> {
        self.stages.iter().find(|entry| entry.stage == name)
    }
}

/// One line per message: `role#id: content`, newlines escaped.
pub fn render_history(history: &[Message]) -> String {
    let mut out = String::new();
    for message in history {
        let id = message
            .id
            .as_ref()
            .map(|id| format!("#{id}"))
            .unwrap_or_default();
        let description = message
            .description_text()
            .map(|text| format!(" [description: {text}]"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}{id}: {}{description}\n",
            message.role.label(),
            message.content.replace('\n', "\\n")
        ));
    }
    out
}

fn history_diff(before: &str, after: &str) -> Vec<String> {
    if before == after {
        return Vec::new();
    }
    TextDiff::from_lines(before, after)
        .unified_diff()
        .header("before", "after")
        .to_string()
        .lines()
        .map(str::to_string)
        .collect()
}
