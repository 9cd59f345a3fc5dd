use crate::types::{FeedItem, ItemBody};
use crate::utils::text;
use tracing::{debug, warn};

pub const UNAVAILABLE_MARKER: &str = "(no content available - title only)";

/// Items of one category, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSection {
    pub label: String,
    pub items: Vec<FeedItem>,
}

/// Bounded text handed to the generator, one section per category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Corpus {
    pub sections: Vec<CorpusSection>,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.items.is_empty())
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .filter(|s| !s.items.is_empty())
            .map(render_section)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Per-category input of [`normalize`], in configured order.
#[derive(Debug, Clone)]
pub struct CategoryItems {
    pub label: String,
    pub max_items: usize,
    pub items: Vec<FeedItem>,
}

fn render_item(index: usize, item: &FeedItem) -> String {
    let mut block = format!("{}. {}\n", index + 1, item.title);
    match &item.body {
        ItemBody::Transcript(body) | ItemBody::Description(body) => {
            block.push_str(body);
            block.push('\n');
        }
        ItemBody::Unavailable => {
            block.push_str(UNAVAILABLE_MARKER);
            block.push('\n');
        }
        ItemBody::TitleOnly => {}
    }
    block
}

fn render_section(section: &CorpusSection) -> String {
    let mut out = format!("[{}]\n", section.label);
    for (i, item) in section.items.iter().enumerate() {
        out.push_str(&render_item(i, item));
    }
    out
}

/// Assemble the corpus: caps per category, then whole-item trimming until the
/// rendered text fits `max_chars`. Items are never cut in the middle, except
/// that the last remaining item is kept and its body shortened instead of
/// dropped, so collected content never turns into an empty corpus.
pub fn normalize(categories: Vec<CategoryItems>, max_chars: usize) -> Corpus {
    let mut sections: Vec<CorpusSection> = categories
        .into_iter()
        .filter_map(|category| {
            let mut items = category.items;
            items.truncate(category.max_items);
            if items.is_empty() {
                None
            } else {
                Some(CorpusSection {
                    label: category.label,
                    items,
                })
            }
        })
        .collect();

    loop {
        let mut corpus = Corpus { sections };
        let size = text::char_len(&corpus.render());
        if size <= max_chars || corpus.is_empty() {
            return corpus;
        }

        if corpus.item_count() == 1 {
            if let Some(item) = corpus.sections.iter_mut().find_map(|s| s.items.first_mut()) {
                shorten_body(item, size - max_chars);
                warn!(
                    title = %item.title,
                    size,
                    max_chars,
                    "Single item exceeds the corpus limit, shortening its body"
                );
            }
            return corpus;
        }
        sections = corpus.sections;

        // Drop the oldest item of the largest section; ties go to the later one.
        let idx = sections
            .iter()
            .enumerate()
            .max_by_key(|(i, s)| (s.items.len(), *i))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let dropped = sections[idx].items.pop();
        debug!(
            section = %sections[idx].label,
            title = dropped.as_ref().map(|d| d.title.as_str()).unwrap_or_default(),
            size,
            max_chars,
            "Corpus over limit, dropping oldest item"
        );
        sections.retain(|s| !s.items.is_empty());
    }
}

/// Remove `excess` characters from the end of the item's body, if it has one.
fn shorten_body(item: &mut FeedItem, excess: usize) {
    if let ItemBody::Transcript(body) | ItemBody::Description(body) = &mut item.body {
        let keep = text::char_len(body).saturating_sub(excess);
        *body = text::truncate_chars(body, keep).to_string();
    }
}
