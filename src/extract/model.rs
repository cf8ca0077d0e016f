//! Model page extraction
//!
//! A model page lists every compatible part inside a section that starts at
//! the `Parts for the <MODEL>` heading and runs until the next known section
//! (Q&A, symptoms, videos, installation instructions).

use crate::extract::links::{
    floor_char_boundary, manufacturer_part_from_slug, part_links, site_links, truncate_chars,
};
use crate::extract::{ModelMedia, ParsedModel, ParsedPart, QaPair};
use crate::url::SiteScope;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static MODEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Models/([A-Za-z0-9\-]+)/?").expect("valid model regex"));

static PART_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^PS\d+").expect("valid part number regex"));

static SYMPTOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"/Symptoms/([^)/\s?#"]+)"#).expect("valid symptom regex"));

static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t>*-]*Q:[ \t]*").expect("valid question regex"));

static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*A:\s*").expect("valid answer regex"));

/// Markers of the sections that follow the parts list
const SECTION_END_MARKERS: &[&str] = &[
    "Questions And Answers",
    "Common Symptoms",
    "Videos related",
    "Installation Instructions",
];

/// Upper bound on the parts section when no end marker follows it
const MAX_SECTION_BYTES: usize = 20_000;

const MAX_SYMPTOMS: usize = 100;
const MAX_MEDIA: usize = 200;
const MAX_QA_PAIRS: usize = 50;
const MAX_QUESTION_CHARS: usize = 2_000;
const MAX_ANSWER_CHARS: usize = 4_000;

/// Extracts a model and its compatible parts from a model page
///
/// Returns `None` when the URL carries no `/Models/<number>` segment.
pub fn parse_model_page(
    url: &str,
    markdown: &str,
    title: &str,
    site: &SiteScope,
) -> Option<ParsedModel> {
    let model_number = MODEL_RE.captures(url)?.get(1)?.as_str().to_uppercase();
    let (brand, appliance_type) = brand_and_type(title);

    let section = model_section(markdown, &model_number);
    let parts = extract_parts(section, site);

    Some(ParsedModel {
        model_number,
        brand,
        appliance_type,
        parts,
        symptoms: extract_symptoms(markdown),
        media: extract_media(markdown, site),
        qa: extract_qa(markdown),
    })
}

/// Derives brand and appliance type from a title like
/// `Whirlpool Dishwasher WDT780SAEM1 - Parts & Repair Help`
fn brand_and_type(title: &str) -> (Option<String>, String) {
    let lower = title.to_lowercase();

    // "dishwasher" contains "washer", so order matters
    let appliance = if lower.contains("dishwasher") {
        "dishwasher"
    } else if lower.contains("refrigerator") || lower.contains("fridge") {
        "refrigerator"
    } else if lower.contains("freezer") {
        "freezer"
    } else if lower.contains("washer") {
        "washer"
    } else if lower.contains("dryer") {
        "dryer"
    } else if lower.contains("microwave") {
        "microwave"
    } else if lower.contains("range") || lower.contains("oven") || lower.contains("cooktop") {
        "range"
    } else {
        "unknown"
    };

    let brand = title.split_whitespace().next().map(str::to_string);
    (brand, appliance.to_string())
}

fn model_section<'a>(markdown: &'a str, model_number: &str) -> &'a str {
    let key = format!("Parts for the {}", model_number);
    let Some(start) = markdown.find(&key) else {
        return markdown;
    };

    let end = SECTION_END_MARKERS
        .iter()
        .filter_map(|marker| markdown[start..].find(marker).map(|i| start + i))
        .min()
        .unwrap_or_else(|| floor_char_boundary(markdown, start + MAX_SECTION_BYTES));

    &markdown[start..end]
}

fn extract_parts(section: &str, site: &SiteScope) -> Vec<ParsedPart> {
    let mut seen = HashSet::new();
    let mut parts = Vec::new();

    for link in part_links(section, site) {
        let Some(ps) = PART_NUMBER_RE.find(link.slug) else {
            continue;
        };
        let partselect_number = ps.as_str().to_uppercase();
        if !seen.insert(partselect_number.clone()) {
            continue;
        }

        parts.push(ParsedPart {
            partselect_number,
            part_url: site.canonicalize(link.href),
            name: None,
            manufacturer_part_number: manufacturer_part_from_slug(link.slug),
            price_value: None,
        });
    }

    parts
}

fn extract_symptoms(markdown: &str) -> Vec<String> {
    let mut symptoms: Vec<String> = Vec::new();

    for caps in SYMPTOM_RE.captures_iter(markdown) {
        let symptom = caps[1].replace('-', " ").replace("%E2%80%99", "'");
        let symptom = symptom.trim().to_string();
        if !symptom.is_empty() && !symptoms.contains(&symptom) {
            symptoms.push(symptom);
        }
        if symptoms.len() >= MAX_SYMPTOMS {
            break;
        }
    }

    symptoms
}

fn extract_media(markdown: &str, site: &SiteScope) -> Vec<ModelMedia> {
    let mut media: Vec<ModelMedia> = Vec::new();

    for link in site_links(markdown, site) {
        let (media_type, fallback_title) = if link.href.contains("/Videos/?VideoID=") {
            ("video", "model video")
        } else if link.href.contains("/Instructions/") {
            ("instruction", "model instruction")
        } else {
            continue;
        };

        // The video id lives in the query string, so keep the raw href
        let url = link.href.trim().to_string();
        if media.iter().any(|m| m.media_type == media_type && m.url == url) {
            continue;
        }

        let title = link.text.trim();
        media.push(ModelMedia {
            media_type: media_type.to_string(),
            title: if title.is_empty() { fallback_title } else { title }.to_string(),
            url,
        });
        if media.len() >= MAX_MEDIA {
            break;
        }
    }

    media
}

/// Pulls `Q: ... A: ...` pairs, each bounded by the next line-leading `Q:`
fn extract_qa(markdown: &str) -> Vec<QaPair> {
    let starts: Vec<(usize, usize)> = QUESTION_RE
        .find_iter(markdown)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut pairs = Vec::new();
    for (i, &(_, body_start)) in starts.iter().enumerate() {
        let block_end = starts.get(i + 1).map(|&(s, _)| s).unwrap_or(markdown.len());
        let block = &markdown[body_start..block_end];

        let Some(split) = ANSWER_RE.find(block) else {
            continue;
        };
        let question = block[..split.start()].trim();
        let answer = block[split.end()..].trim();
        if question.is_empty() || answer.is_empty() {
            continue;
        }

        pairs.push(QaPair {
            question: truncate_chars(question, MAX_QUESTION_CHARS),
            answer: truncate_chars(answer, MAX_ANSWER_CHARS),
        });
        if pairs.len() >= MAX_QA_PAIRS {
            break;
        }
    }

    pairs
}
