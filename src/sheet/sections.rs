use crate::model::{AnswerPair, IMPLICIT_SECTION_NAME, Section};

/// Splits `pairs` across the discovered sections by count, in document order.
///
/// Question blocks carry no reliable anchor to their section header, so each section
/// receives `pairs / sections` pairs and the last one absorbs the remainder. With no
/// named sections every pair goes to the implicit section instead.
pub fn assign_pairs_to_sections(
    section_names: &[String],
    pairs: Vec<AnswerPair>,
) -> (Vec<Section>, Option<Section>) {
    if section_names.is_empty() {
        return (Vec::new(), implicit_section(pairs));
    }

    let per_section = pairs.len() / section_names.len();
    let mut remaining = pairs.into_iter();
    let last_index = section_names.len() - 1;

    let sections = section_names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let mut section = Section::new(name.clone());
            if index == last_index {
                section.pairs.extend(remaining.by_ref());
            } else {
                section.pairs.extend(remaining.by_ref().take(per_section));
            }
            section
        })
        .collect();

    (sections, None)
}

/// Puts every pair in the last discovered section (or the implicit one).
pub fn attach_to_last_section(
    section_names: &[String],
    pairs: Vec<AnswerPair>,
) -> (Vec<Section>, Option<Section>) {
    let Some((last, leading)) = section_names.split_last() else {
        return (Vec::new(), implicit_section(pairs));
    };

    let mut sections = leading
        .iter()
        .map(|name| Section::new(name.clone()))
        .collect::<Vec<Section>>();
    sections.push(Section {
        name: last.clone(),
        pairs,
    });

    (sections, None)
}

fn implicit_section(pairs: Vec<AnswerPair>) -> Option<Section> {
    if pairs.is_empty() {
        return None;
    }

    Some(Section {
        name: IMPLICIT_SECTION_NAME.to_string(),
        pairs,
    })
}
