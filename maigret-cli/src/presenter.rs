//! Console output.
//!
//! Every line is built by a pure `render_*` method and printed by the
//! caller; results arrive through a single channel so lines never interleave.

use colored::{ColoredString, Colorize};
use maigret_probe::{Outcome, ProbeEvent, ProbeResult, RunCounters, SelfTestReport};
use maigret_sites::ValidationError;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

type Style = fn(&str) -> ColoredString;

#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    color: bool,
    verbose: bool,
}

impl Presenter {
    pub fn new(color: bool, verbose: bool) -> Self {
        Self { color, verbose }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn tagged(&self, tag: &str, tag_style: Style, body: &str) -> String {
        format!("[{}] {}", self.paint(tag, tag_style), body)
    }

    pub fn info(&self, message: &str) -> String {
        self.tagged("*", |s| s.bright_blue(), message)
    }

    pub fn warning(&self, message: &str) -> String {
        let body = self.paint(message, |s| s.yellow());
        self.tagged("!", |s| s.bright_yellow(), &body)
    }

    pub fn success(&self, message: &str) -> String {
        let body = self.paint(message, |s| s.bright_white());
        self.tagged("+", |s| s.bright_green(), &body)
    }

    pub fn site_error(&self, site: &str, error: &str) -> String {
        let body = format!(
            "{}: {}: {}",
            site,
            self.paint("ERROR", |s| s.bright_magenta()),
            self.paint(error, |s| s.bright_red())
        );
        self.tagged("!", |s| s.bright_red(), &body)
    }

    pub fn render_result(&self, result: &ProbeResult) -> Option<String> {
        match result.outcome {
            Outcome::Found => {
                let body = format!("{}: {}", self.paint(result.site.as_str(), |s| s.bright_white()), result.url);
                Some(self.tagged("+", |s| s.bright_green(), &body))
            }
            Outcome::NotFound if self.verbose => {
                let body = format!("{}: {}", result.site, self.paint("Not Found!", |s| s.bright_yellow()));
                Some(self.tagged("-", |s| s.bright_red(), &body))
            }
            Outcome::Unknown if self.verbose => Some(self.site_error(
                result.site.as_str(),
                result.error.as_deref().unwrap_or("unknown error"),
            )),
            _ => None,
        }
    }

    pub fn render_event(&self, event: &ProbeEvent) -> Option<String> {
        match event {
            ProbeEvent::UsernameStarted { username, sites } => Some(format!(
                "\n{}",
                self.info(&format!(
                    "Investigating {} on {} sites:",
                    self.paint(username, |s| s.bright_green().bold()),
                    sites
                ))
            )),
            ProbeEvent::Result(result) => self.render_result(result),
            ProbeEvent::UsernameFinished {
                username,
                counters,
                elapsed,
            } => Some(self.info(&format!(
                "{}: found {} of {} sites in {}",
                username,
                counters.found,
                counters.checked,
                seconds(*elapsed)
            ))),
        }
    }

    /// Print events until every sender is gone.
    pub async fn drain(self, mut events: UnboundedReceiver<ProbeEvent>) {
        while let Some(event) = events.recv().await {
            if let Some(line) = self.render_event(&event) {
                println!("{line}");
            }
        }
    }

    pub fn render_summary(&self, counters: RunCounters, elapsed: Duration) -> Vec<String> {
        let rule = self.paint(&"=".repeat(40), |s| s.bright_cyan());
        vec![
            String::new(),
            rule.clone(),
            format!("  {}", self.paint("SCAN COMPLETE", |s| s.bright_white().bold())),
            rule.clone(),
            format!("  {}:    {}", self.paint("Found", |s| s.bright_green()), counters.found),
            format!("  {}:  {}", self.paint("Checked", |s| s.bright_blue()), counters.checked),
            format!("  {}:     {}", self.paint("Time", |s| s.bright_yellow()), seconds(elapsed)),
            rule,
        ]
    }

    pub fn render_rejected(&self, rejected: &[ValidationError]) -> Vec<String> {
        if rejected.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![self.warning(&format!(
            "{} site entries were skipped as invalid",
            rejected.len()
        ))];
        if self.verbose {
            lines.extend(
                rejected
                    .iter()
                    .map(|e| self.site_error(&e.site, &e.reason)),
            );
        }
        lines
    }

    pub fn render_self_test(&self, report: &SelfTestReport) -> Vec<String> {
        let mut lines: Vec<String> = report
            .failures()
            .map(|check| {
                let errors: Vec<&str> = [&check.claimed, &check.unclaimed]
                    .into_iter()
                    .filter_map(|c| c.error.as_deref())
                    .collect();

                if errors.is_empty() {
                    self.warning(&format!(
                        "{}: Not working ({})",
                        check.site,
                        check.failure().unwrap_or_default()
                    ))
                } else {
                    let joined: String = errors.iter().map(|e| format!("[{e}]")).collect();
                    self.site_error(check.site.as_str(), &format!("Failed with error {joined}"))
                }
            })
            .collect();

        lines.push(self.success("Done"));
        lines.push(format!(
            "\nThese {} sites are not compatible with the site catalog.",
            report.incompatible_count()
        ));
        lines
    }

    pub fn render_downloaders(&self, sites: &[&str]) -> Vec<String> {
        let mut lines = vec!["List of sites that can download userdata:".to_string()];
        lines.extend(sites.iter().map(|site| self.success(site)));
        lines
    }
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
