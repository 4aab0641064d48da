//! Terminal view surface
//!
//! Keeps the same keyed tree as the in-memory surface and prints every
//! effective change. The progress container drives an indicatif bar; while it
//! is live other output is written with the bar suspended so lines are not torn.

use colored::*;
use console::Term;
use gemma_core::view::{NodeKind, NodeTree, ViewNode, ViewSurface, containers};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;

pub struct TerminalSurface {
    tree: NodeTree,
    verbose: bool,
    width: usize,
    bar: Option<ProgressBar>,
    /// The archive list is redrawn whole on every page; only new rows print
    listed: HashSet<String>,
}

impl TerminalSurface {
    pub fn new(verbose: bool) -> Self {
        let (_, cols) = Term::stdout().size();
        Self {
            tree: NodeTree::new(),
            verbose,
            width: (cols as usize).clamp(40, 120),
            bar: None,
            listed: HashSet::new(),
        }
    }

    #[allow(dead_code)]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    fn emit(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn emit_err(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }

    fn rule(&self) -> String {
        "─".repeat(self.width).dimmed().to_string()
    }

    fn progress(&mut self, node: &ViewNode) {
        let percent = node
            .attr("percent")
            .and_then(|p| p.parse::<u64>().ok())
            .unwrap_or(0);
        let bar = self.bar.get_or_insert_with(new_bar);
        bar.set_position(percent);
        bar.set_message(node.text.clone());
    }

    fn finish_progress(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn show(&mut self, container: &str, node: &ViewNode) {
        match container {
            containers::PROGRESS => self.progress(node),
            containers::STATUS => {
                if node.attr("running") == Some("false") {
                    self.finish_progress();
                }
                if self.verbose {
                    self.emit(format!("{} {}", "state".dimmed(), node.text));
                }
            }
            containers::COUNT => {
                let text = if node.attr("approximate") == Some("true") {
                    node.text.yellow().bold()
                } else {
                    node.text.bold()
                };
                self.emit(text.to_string());
            }
            containers::FILTER_SUMMARY => {
                self.emit(format!("{} {}", "Filters:".dimmed(), node.text.dimmed()));
            }
            containers::RESULTS => self.show_card(node),
            containers::SUMMARY => self.show_summary(node),
            containers::BROWSE => match node.kind {
                NodeKind::Notice if !node.text.is_empty() => {
                    let more = if node.attr("has_more") == Some("true") {
                        " · more pages available"
                    } else {
                        ""
                    };
                    self.emit(format!("{}{}", node.text, more).dimmed().to_string());
                }
                NodeKind::Notice => {}
                _ => self.emit(node.text.clone()),
            },
            containers::ARCHIVE => {
                if !self.listed.insert(node.key.clone()) {
                    return;
                }
                let id = node.attr("artifact_id").unwrap_or_default();
                let tag = if node.attr("local") == Some("true") {
                    " [local]".yellow().to_string()
                } else {
                    String::new()
                };
                self.emit(format!(
                    "{:<24} {}{} {}",
                    id.cyan(),
                    node.text,
                    tag,
                    node.attr("created_at").unwrap_or_default().dimmed()
                ));
            }
            containers::PREVIEW => match node.kind {
                NodeKind::Card => {
                    self.emit(self.rule());
                    self.emit(
                        node.attr("title")
                            .unwrap_or_default()
                            .bold()
                            .underline()
                            .to_string(),
                    );
                    self.emit(node.text.clone());
                    self.emit(self.rule());
                }
                _ => self.emit(format!("{} {}", "⚠".yellow().bold(), node.text.yellow())),
            },
            containers::CHAT => {
                let who = match node.attr("role") {
                    Some("user") => "you".green().bold(),
                    Some("assistant") => "gemma".magenta().bold(),
                    _ => "system".dimmed(),
                };
                self.emit(format!("{who}> {}", node.text));
            }
            containers::LOG if self.verbose => {
                let level = node.attr("level").unwrap_or("info");
                let text = match level {
                    "error" => node.text.red(),
                    "warn" => node.text.yellow(),
                    _ => node.text.dimmed(),
                };
                self.emit_err(text.to_string());
            }
            containers::TOASTS => {
                if node.attr("level") == Some("error") {
                    self.emit_err(format!("{} {}", "✗".red().bold(), node.text.red()));
                } else {
                    self.emit(format!("{} {}", "✓".green().bold(), node.text.green()));
                }
            }
            _ => {}
        }
    }

    fn show_card(&self, node: &ViewNode) {
        let mut lines = node.text.lines();
        if let Some(head) = lines.next() {
            self.emit(head.cyan().bold().to_string());
        }
        for line in lines {
            self.emit(format!("  {line}"));
        }
    }

    fn show_summary(&mut self, node: &ViewNode) {
        match node.key.as_str() {
            "error" => {
                self.finish_progress();
                self.emit_err(format!("{} {}", "✗".red().bold(), node.text.red()));
            }
            "quick" => {
                self.emit(self.rule());
                self.emit(node.text.clone());
                self.emit(
                    format!(
                        "{} transcripts in {}s",
                        node.attr("transcripts").unwrap_or("0"),
                        node.attr("seconds").unwrap_or("0.0")
                    )
                    .dimmed()
                    .to_string(),
                );
                if let Some(saved) = node.attr("saved_to") {
                    self.emit(format!("{} {}", "saved to".dimmed(), saved));
                }
            }
            _ => {
                self.emit(self.rule());
                let heading = match node.attr("source") {
                    Some("local") => "Summary (local)".yellow().bold(),
                    _ => "Summary".bold(),
                };
                self.emit(heading.to_string());
                self.emit(node.text.clone());
                let mut meta = Vec::new();
                if let Some(model) = node.attr("model") {
                    meta.push(format!("model {model}"));
                }
                if let Some(id) = node.attr("artifact_id") {
                    meta.push(format!("artifact {id}"));
                }
                if !meta.is_empty() {
                    self.emit(meta.join(" · ").dimmed().to_string());
                }
            }
        }
    }
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
    {
        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    bar
}

impl ViewSurface for TerminalSurface {
    fn upsert(&mut self, container: &str, node: ViewNode) {
        let before = self.tree.revision();
        self.tree.upsert(container, node.clone());
        if self.tree.revision() != before {
            self.show(container, &node);
        }
    }

    fn append(&mut self, container: &str, node: ViewNode) -> bool {
        let added = self.tree.append(container, node.clone());
        if added {
            self.show(container, &node);
        }
        added
    }

    fn remove(&mut self, container: &str, key: &str) -> bool {
        self.tree.remove(container, key)
    }

    fn clear(&mut self, container: &str) {
        if container == containers::PROGRESS {
            self.finish_progress();
        }
        self.tree.clear(container);
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.finish_progress();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_upsert_is_not_reprinted() {
        let mut surface = TerminalSurface::new(false);
        let node = ViewNode::new("count", NodeKind::Text, "12 transcripts");
        surface.upsert(containers::COUNT, node.clone());
        let revision = surface.tree().revision();
        surface.upsert(containers::COUNT, node);
        assert_eq!(surface.tree().revision(), revision);
    }

    #[test]
    fn test_terminal_state_closes_the_bar() {
        let mut surface = TerminalSurface::new(false);
        surface.upsert(
            containers::PROGRESS,
            ViewNode::new("bar", NodeKind::Progress, "1/3").with_attr("percent", "33"),
        );
        assert!(surface.bar.is_some());
        surface.upsert(
            containers::STATUS,
            ViewNode::new("state", NodeKind::Text, "Completed").with_attr("running", "false"),
        );
        assert!(surface.bar.is_none());
    }
}
