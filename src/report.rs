use crate::classifier::{Classification, IdStatus};
use crate::provider::{Matching, ResolutionMode};
use crate::registry::Registry;
use colored::Colorize;
use serde::Serialize;

/// Identification results for every input
#[derive(Debug, Serialize)]
pub struct Report {
    pub entries: Vec<InputReport>,
}

/// Results for a single input string
#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    pub input: String,
    /// One per matching scheme; the remote service may return several
    pub results: Vec<Classification>,
    /// Closest known type when the prefix was not recognized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl InputReport {
    /// Best status across results: valid, then ambiguous, then invalid
    pub fn status(&self) -> IdStatus {
        [IdStatus::Valid, IdStatus::Ambiguous, IdStatus::Invalid]
            .into_iter()
            .find(|s| self.results.iter().any(|r| r.status == *s))
            .unwrap_or(IdStatus::Unknown)
    }

    pub fn valid_results(&self) -> impl Iterator<Item = &Classification> {
        self.results.iter().filter(|r| r.is_valid())
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, report: InputReport) {
        self.entries.push(report);
    }

    fn count(&self, status: IdStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    pub fn count_valid(&self) -> usize {
        self.count(IdStatus::Valid)
    }

    pub fn count_invalid(&self) -> usize {
        self.count(IdStatus::Invalid)
    }

    pub fn count_ambiguous(&self) -> usize {
        self.count(IdStatus::Ambiguous)
    }

    pub fn count_unknown(&self) -> usize {
        self.count(IdStatus::Unknown)
    }

    /// Print the report to stdout with colors
    pub fn print(&self) {
        for entry in &self.entries {
            print_input_report(entry);
        }

        if self.entries.len() > 1 {
            println!(
                "{} inputs: {} valid, {} invalid, {} ambiguous, {} unknown",
                self.entries.len(),
                self.count_valid().to_string().green(),
                self.count_invalid().to_string().red(),
                self.count_ambiguous().to_string().yellow(),
                self.count_unknown().to_string().dimmed()
            );
        }
    }

    /// Print just the URL of `mode` for every valid result
    pub fn print_urls(&self, mode: ResolutionMode) {
        for entry in &self.entries {
            for result in entry.valid_results() {
                if let Some(url) = result.url(mode) {
                    println!("{}", url);
                }
            }
        }
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_input_report(entry: &InputReport) {
    println!("{}", entry.input.bold());

    if entry.results.iter().all(|r| r.status == IdStatus::Unknown) {
        println!("  {}", "Not a recognized PID".dimmed());
        if let Some(suggestion) = &entry.suggestion {
            println!("  Did you mean {}?", suggestion.cyan());
        }
        println!();
        return;
    }

    for result in entry.results.iter().filter(|r| r.status != IdStatus::Unknown) {
        print_classification(result);
    }
    println!();
}

fn print_classification(result: &Classification) {
    let badge = match result.status {
        IdStatus::Valid => "VALID".green().bold(),
        IdStatus::Invalid => "INVALID".red().bold(),
        IdStatus::Ambiguous => "AMBIGUOUS".yellow().bold(),
        IdStatus::Unknown => "UNKNOWN".dimmed(),
    };
    println!("  {} {}", result.pid_type.cyan(), badge);

    match result.status {
        IdStatus::Valid => {
            for mode in &result.modes {
                println!(
                    "    {:<13} {}",
                    format!("{}:", mode.name),
                    result.jump_urls.get(mode.mode)
                );
            }
        }
        IdStatus::Invalid => {
            if let Some(example) = result.examples.first() {
                println!("    {} {}", "example:".dimmed(), example);
            }
        }
        IdStatus::Ambiguous => {
            println!("    {}", "Please enter one of:".dimmed());
            for example in &result.examples {
                println!("      {}", example);
            }
        }
        IdStatus::Unknown => {}
    }
}

/// Print the supported providers
pub fn print_providers(registry: &Registry) {
    println!("{}", "Supported PIDs".bold());
    println!("{}", "=".repeat(50));

    for provider in registry.iter() {
        if let Matching::Umbrella { sub_schemes } = &provider.matching {
            println!(
                "{} {} {}",
                format!("[{}]", provider.pid_type).yellow(),
                provider.name.bold(),
                format!("(see {})", sub_schemes.join(", ")).dimmed()
            );
            continue;
        }

        println!(
            "{} {}",
            format!("[{}]", provider.pid_type).yellow(),
            provider.name.bold()
        );
        if let Some(description) = &provider.description {
            println!("    {}", truncate(description, 100));
        }
        if let Some(example) = &provider.example {
            println!("    {} {}", "example:".dimmed(), example);
        }
        if !provider.modes.is_empty() {
            let modes: Vec<&str> = provider.modes.iter().map(|m| m.name.as_str()).collect();
            println!("    {} {}", "modes:".dimmed(), modes.join(", "));
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    fn report_for(inputs: &[&str]) -> Report {
        let registry = Registry::builtin("https://api.example.org/v1/metaresolvers/resolve").unwrap();
        let mut report = Report::new();
        for input in inputs {
            report.add(InputReport {
                input: input.to_string(),
                results: vec![classify(input, &registry)],
                suggestion: None,
            });
        }
        report
    }

    #[test]
    fn test_counts_by_status() {
        let report = report_for(&[
            "ark:/13030/tf5p30086k",
            "doi:nope",
            "urn:nbn:xx:1",
            "hello",
            "arxiv:1512.00135",
        ]);
        assert_eq!(report.count_valid(), 2);
        assert_eq!(report.count_invalid(), 1);
        assert_eq!(report.count_ambiguous(), 1);
        assert_eq!(report.count_unknown(), 1);
    }

    #[test]
    fn test_best_status_wins_across_results() {
        let registry = Registry::builtin("https://api.example.org/v1/metaresolvers/resolve").unwrap();
        let entry = InputReport {
            input: "doi:10.5281/zenodo.8056361".to_string(),
            results: vec![
                classify("doi:bad", &registry),
                classify("doi:10.5281/zenodo.8056361", &registry),
            ],
            suggestion: None,
        };
        assert_eq!(entry.status(), IdStatus::Valid);
        assert_eq!(entry.valid_results().count(), 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ääääääääää", 6), "äää...");
    }
}
