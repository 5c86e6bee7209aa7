use anyhow::{Context, Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::model::{ExtractionPass, ParseResult};

mod fallback;
mod option;
mod sections;
mod structure;


use sections::{assign_pairs_to_sections, attach_to_last_section};

const MAX_SECTION_NAME_CHARS: usize = 120;
const SECTION_LABEL_PREFIX: &str = "section";

/// Compiled selectors and patterns for reading an exported "review answers" sheet.
#[derive(Debug)]
pub struct SheetParser {
    any_element: Selector,
    cell: Selector,
    row: Selector,
    image: Selector,
    menu_table: Selector,
    section_label: Regex,
    question_number: Regex,
    fallback_answer: Regex,
}

impl SheetParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            any_element: compile_selector("*")?,
            cell: compile_selector("td, th")?,
            row: compile_selector("tr")?,
            image: compile_selector("img")?,
            menu_table: compile_selector("table.menu-tbl")?,
            section_label: Regex::new(r"(?i)^section\s*:\s*(\S.*)$")
                .context("failed to compile section label regex")?,
            question_number: Regex::new(r"^Q\.\d+$")
                .context("failed to compile question number regex")?,
            fallback_answer: Regex::new(
                r"(?is)your\s+answer\s*:\s*([A-D]\b|--|not\s+attempted).*?correct\s+answer\s*:\s*([A-D])\b",
            )
            .context("failed to compile fallback answer regex")?,
        })
    }

    /// Never fails: markup that cannot be read degrades to fewer (or zero) pairs.
    pub fn parse(&self, html: &str) -> ParseResult {
        if html.trim().is_empty() {
            return ParseResult::default();
        }

        let document = Html::parse_document(html);
        let section_names = self.discover_sections(&document);

        let pairs = self.extract_structured_pairs(&document);
        if !pairs.is_empty() {
            info!(
                sections = section_names.len(),
                pairs = pairs.len(),
                "parsed question blocks"
            );
            let (sections, implicit) = assign_pairs_to_sections(&section_names, pairs);
            return ParseResult {
                sections,
                implicit,
                extraction: ExtractionPass::Structured,
            };
        }

        debug!("no structured question blocks found, scanning flattened text");
        let fallback_pairs = self.extract_text_fallback_pairs(&document);
        if fallback_pairs.is_empty() {
            warn!(
                sections = section_names.len(),
                "no answer pairs found by either pass"
            );
            let (sections, implicit) = assign_pairs_to_sections(&section_names, Vec::new());
            return ParseResult {
                sections,
                implicit,
                extraction: ExtractionPass::None,
            };
        }

        info!(
            sections = section_names.len(),
            pairs = fallback_pairs.len(),
            "recovered answer pairs from flattened text"
        );
        let (sections, implicit) = attach_to_last_section(&section_names, fallback_pairs);
        ParseResult {
            sections,
            implicit,
            extraction: ExtractionPass::TextFallback,
        }
    }

    /// Innermost elements whose whole text reads "Section : <name>", in document order.
    fn discover_sections(&self, document: &Html) -> Vec<String> {
        let mut names = Vec::new();

        for candidate in document.select(&self.any_element) {
            let Some(name) = self.section_name(candidate) else {
                continue;
            };

            let wraps_label = child_elements(candidate)
                .any(|child| self.section_name(child).is_some());
            if wraps_label {
                continue;
            }

            names.push(name);
        }

        names
    }

    fn section_name(&self, element: ElementRef<'_>) -> Option<String> {
        if matches!(element.value().name(), "html" | "head" | "body" | "script" | "style") {
            return None;
        }

        let text = self.bounded_label_text(element)?;
        let captures = self.section_label.captures(&text)?;
        let name = captures.get(1)?.as_str().trim();
        if name.is_empty() || name.chars().count() > MAX_SECTION_NAME_CHARS {
            return None;
        }

        Some(name.to_string())
    }

    /// Collapsed text of a possible label. Gives up as soon as the first text does not
    /// start with "section" or the visible characters outgrow the longest allowed label,
    /// so large wrappers are rejected without flattening them.
    fn bounded_label_text(&self, element: ElementRef<'_>) -> Option<String> {
        let mut fragments = element
            .text()
            .filter(|fragment| !fragment.trim().is_empty())
            .peekable();

        let first = fragments.peek()?.trim_start();
        let starts_label = first
            .get(..SECTION_LABEL_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(SECTION_LABEL_PREFIX));
        if !starts_label {
            return None;
        }

        let mut budget = SECTION_LABEL_PREFIX.len() + 1 + MAX_SECTION_NAME_CHARS;
        let mut visible = Vec::new();
        for fragment in fragments {
            let weight = fragment.chars().filter(|ch| !ch.is_whitespace()).count();
            budget = budget.checked_sub(weight)?;
            visible.push(fragment);
        }

        Some(collapse_whitespace(&visible.join(" ")))
    }
}

fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("failed to compile selector {css:?}: {err:?}"))
}

pub(crate) fn normalized_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<&str>>().join(" "))
}

pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}
