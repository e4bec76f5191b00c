// ABOUTME: Plain-text rendering of AI payloads for the terminal transcript.
// ABOUTME: Entrepreneurial roadmaps become titled sections; template names are collected for download.

use serde_json::Value;

use crate::api::envelope::{Envelope, ResponseKind, truthy, value_text};
use crate::api::types::ChatMessage;

/// Text shown in the transcript for a message.
pub fn message_text(message: &ChatMessage) -> String {
    let Some(envelope) = &message.envelope else {
        return message.text.clone();
    };
    match envelope.kind {
        ResponseKind::Entrepreneurial => {
            let formatted = format_entrepreneurial(payload_data(envelope));
            if formatted.trim().is_empty() {
                fallback(message, envelope)
            } else {
                formatted
            }
        }
        ResponseKind::Image => {
            let logo = envelope
                .raw
                .get("logo")
                .or_else(|| envelope.data.as_ref().and_then(|d| d.get("logo")))
                .map(value_text);
            match logo {
                Some(url) if message.text.is_empty() => format!("Logo: {url}"),
                Some(url) => format!("{}\nLogo: {url}", message.text),
                None => fallback(message, envelope),
            }
        }
        _ => fallback(message, envelope),
    }
}

fn fallback(message: &ChatMessage, envelope: &Envelope) -> String {
    if message.text.is_empty() {
        envelope.display_text()
    } else {
        message.text.clone()
    }
}

/// The roadmap object lives under `data` when present, else it is the payload itself.
fn payload_data(envelope: &Envelope) -> &Value {
    envelope
        .data
        .as_ref()
        .filter(|d| truthy(d))
        .unwrap_or(&envelope.raw)
}

/// Template file names offered by a message, in order of appearance.
pub fn template_names(message: &ChatMessage) -> Vec<String> {
    let Some(envelope) = message
        .envelope
        .as_ref()
        .filter(|e| e.kind == ResponseKind::Entrepreneurial)
    else {
        return Vec::new();
    };

    let mut names = Vec::new();
    for step in array(payload_data(envelope).get("roadmap")) {
        for template in array(step.get("templates")) {
            if let Some(name) = template_info(template).and_then(|t| t.file_name) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }
    names
}

struct TemplateInfo {
    title: String,
    file_name: Option<String>,
    description: Option<String>,
}

/// Templates come as a bare name, `{template_name, description}`, or
/// `{key: {template_name, description}}`.
fn template_info(template: &Value) -> Option<TemplateInfo> {
    match template {
        Value::String(name) if !name.is_empty() => Some(TemplateInfo {
            title: name.clone(),
            file_name: Some(name.clone()),
            description: None,
        }),
        Value::Object(map) => {
            if let Some(name) = str_field(template, "template_name") {
                return Some(TemplateInfo {
                    title: name.clone(),
                    file_name: Some(name),
                    description: str_field(template, "description"),
                });
            }
            let (key, info) = map.iter().next()?;
            let file_name = str_field(info, "template_name");
            Some(TemplateInfo {
                title: file_name.clone().unwrap_or_else(|| key.clone()),
                file_name,
                description: str_field(info, "description"),
            })
        }
        _ => None,
    }
}

/// Render an `entrepreneurial_response` payload as plain text.
pub fn format_entrepreneurial(data: &Value) -> String {
    let mut out: Vec<String> = Vec::new();

    if let Some(summary) = data.get("idea_summary").filter(|s| truthy(s)) {
        if let Some(title) = str_field(summary, "title") {
            out.push(title);
        }
        if let Some(one_liner) = str_field(summary, "one_liner") {
            out.push(one_liner);
        }
        push_list(&mut out, "Strengths", summary.get("strengths"));
        push_list(&mut out, "Risks", summary.get("risks"));
    }

    let roadmap = array(data.get("roadmap"));
    if !roadmap.is_empty() {
        section(&mut out, "Roadmap");
        for (i, step) in roadmap.iter().enumerate() {
            let title = str_field(step, "title").unwrap_or_default();
            out.push(format!("{}. {}", i + 1, title));
            if let Some(description) = str_field(step, "description") {
                out.push(format!("   {description}"));
            }
            let resources = array(step.get("resources"));
            if !resources.is_empty() {
                out.push("   Resources:".to_string());
                for resource in resources {
                    out.push(format!("   - {}", resource_text(resource)));
                }
            }
            let templates = array(step.get("templates"));
            if !templates.is_empty() {
                out.push("   Templates:".to_string());
                for template in templates {
                    let Some(info) = template_info(template) else {
                        out.push("   - Template".to_string());
                        continue;
                    };
                    let marker = if info.file_name.is_some() { "" } else { " (unavailable)" };
                    match info.description {
                        Some(d) => out.push(format!("   - {}{marker}: {d}", info.title)),
                        None => out.push(format!("   - {}{marker}", info.title)),
                    }
                }
            }
        }
    }

    if let Some(support) = data.get("execution_support").filter(|s| truthy(s)) {
        section(&mut out, "Execution Support");
        for content in array(support.get("automated_content")) {
            push_automated_content(&mut out, content);
        }
        if let Some(branding) = support.get("design_branding") {
            let names = array(branding.get("name_ideas"));
            if !names.is_empty() {
                out.push("Name ideas:".to_string());
                out.push(
                    names
                        .iter()
                        .map(value_text)
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
            push_list(&mut out, "Logo concepts", branding.get("logo_concepts"));
        }
    }

    let experts = array(data.get("mentorship").and_then(|m| m.get("suggested_experts")));
    if !experts.is_empty() {
        section(&mut out, "Suggested Mentors");
        for expert in experts {
            let name = str_field(expert, "name").unwrap_or_default();
            let mut line = match str_field(expert, "expertise") {
                Some(expertise) => format!("- {name} ({expertise})"),
                None => format!("- {name}"),
            };
            if let Some(contact) = str_field(expert, "contact") {
                line.push_str(&format!(" <{contact}>"));
            }
            out.push(line);
        }
    }

    let events = array(data.get("events"));
    if !events.is_empty() {
        section(&mut out, "Events");
        for event in events {
            let mut line = format!("- {}", str_field(event, "title").unwrap_or_default());
            if let Some(date) = str_field(event, "date") {
                line.push_str(&format!(", {date}"));
            }
            if let Some(location) = str_field(event, "location") {
                line.push_str(&format!(", {location}"));
            }
            if let Some(link) = str_field(event, "link") {
                line.push_str(&format!(" <{link}>"));
            }
            out.push(line);
        }
    }

    let funding = array(data.get("funding"));
    if !funding.is_empty() {
        section(&mut out, "Funding Opportunities");
        for fund in funding {
            let name = str_field(fund, "name").unwrap_or_default();
            out.push(match str_field(fund, "type") {
                Some(kind) => format!("- {name} ({kind})"),
                None => format!("- {name}"),
            });
            let details: Vec<String> = [
                str_field(fund, "ticket_size").or_else(|| str_field(fund, "amount")),
                str_field(fund, "stage_focus"),
                str_field(fund, "contact"),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !details.is_empty() {
                out.push(format!("  {}", details.join(" | ")));
            }
        }
    }

    out.join("\n")
}

fn push_automated_content(out: &mut Vec<String>, content: &Value) {
    let kind = str_field(content, "type").unwrap_or_default().to_lowercase();
    let title = str_field(content, "title");
    let title_lower = title.as_deref().unwrap_or_default().to_lowercase();
    let draft = str_field(content, "draft").map(|d| normalize_draft(&d));

    if (kind.contains("email") || title_lower.contains("email")) && draft.is_some() {
        let draft = draft.unwrap_or_default();
        let (subject, body) = split_subject(&draft);
        let subject = subject
            .or(title)
            .unwrap_or_else(|| "Announcement Email".to_string());
        out.push(format!("[{subject}]"));
        out.push(body);
        return;
    }

    let heading = title
        .or_else(|| str_field(content, "type"))
        .unwrap_or_default();
    out.push(format!("[{heading}]"));
    if let Some(draft) = draft {
        out.push(draft);
    }
}

/// Drafts sometimes arrive with escaped whitespace.
fn normalize_draft(draft: &str) -> String {
    draft
        .replace("\\n", "\n")
        .replace("\\r", "")
        .replace("\\t", "\t")
        .trim()
        .to_string()
}

/// Pull a `Subject:` line out of an email draft.
fn split_subject(draft: &str) -> (Option<String>, String) {
    let mut subject = None;
    let mut body = Vec::new();
    for line in draft.lines() {
        let trimmed = line.trim_start();
        let is_subject = subject.is_none()
            && trimmed
                .get(..8)
                .is_some_and(|p| p.eq_ignore_ascii_case("subject:"));
        if is_subject {
            subject = Some(trimmed[8..].trim().to_string());
        } else {
            body.push(line);
        }
    }
    (subject, body.join("\n").trim().to_string())
}

fn resource_text(resource: &Value) -> String {
    match resource {
        Value::Object(_) => {
            let title = str_field(resource, "title");
            let url = str_field(resource, "url");
            match (title, url) {
                (Some(t), Some(u)) => format!("{t} <{u}>"),
                (Some(t), None) => t,
                (None, Some(u)) => u,
                (None, None) => "Resource".to_string(),
            }
        }
        other => value_text(other),
    }
}

fn push_list(out: &mut Vec<String>, title: &str, items: Option<&Value>) {
    let items = array(items);
    if items.is_empty() {
        return;
    }
    out.push(format!("{title}:"));
    for item in items {
        out.push(format!("- {}", value_text(item)));
    }
}

fn section(out: &mut Vec<String>, title: &str) {
    if !out.is_empty() {
        out.push(String::new());
    }
    out.push(format!("## {title}"));
}

fn array(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .filter(|v| truthy(v))
        .map(value_text)
}
