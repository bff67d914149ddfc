//! Searchable list of items that plugins replace wholesale.

use crate::common::Item;

mod limited_selection_sort;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexItem {
    pub item: Item,
    /// Text the query is matched against.
    pub string: String,
}

#[derive(Debug)]
pub struct IndexMatch<'a> {
    pub index_item: &'a IndexItem,
    fitness: i32,
}

impl<'a> PartialEq for IndexMatch<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.fitness.eq(&other.fitness)
    }
}
impl<'a> PartialOrd for IndexMatch<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.fitness.partial_cmp(&other.fitness)
    }
}

#[derive(Debug, Default)]
pub struct Index {
    items: Vec<IndexItem>,
}

impl Index {
    pub fn new(items: Vec<IndexItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Every query word has to be the prefix of a word in the item's string.
    /// Whole-word hits count double.
    pub fn find(&self, query: &str, limit: usize) -> Vec<IndexMatch<'_>> {
        let query_words = words(query);
        if query_words.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<_> = self
            .items
            .iter()
            .filter_map(|index_item| {
                let fitness = get_fitness(&query_words, &index_item.string)?;
                Some(IndexMatch {
                    index_item,
                    fitness,
                })
            })
            .collect();

        limited_selection_sort::sort(&mut results, limit);
        results.truncate(limit);
        results
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn get_fitness(query_words: &[String], string: &str) -> Option<i32> {
    let string_words = words(string);
    query_words.iter().try_fold(0, |fitness, query_word| {
        let len = query_word.chars().count() as i32;
        if string_words.iter().any(|w| w == query_word) {
            Some(fitness + 2 * len)
        } else if string_words.iter().any(|w| w.starts_with(query_word.as_str())) {
            Some(fitness + len)
        } else {
            None
        }
    })
}
