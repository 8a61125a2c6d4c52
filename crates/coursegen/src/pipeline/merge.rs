//! Merges per-chunk structure results into one course with globally unique IDs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::content::StructureResult;

/// Old→new ID mappings recorded for one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChunkRemap {
    pub chunk_index: usize,
    pub modules: BTreeMap<String, String>,
    pub lessons: BTreeMap<String, String>,
    pub tasks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdRemapTable {
    pub chunks: Vec<ChunkRemap>,
}

impl IdRemapTable {
    pub fn module_id(&self, chunk_index: usize, old: &str) -> Option<&str> {
        self.chunk(chunk_index)
            .and_then(|c| c.modules.get(old))
            .map(String::as_str)
    }

    pub fn lesson_id(&self, chunk_index: usize, old: &str) -> Option<&str> {
        self.chunk(chunk_index)
            .and_then(|c| c.lessons.get(old))
            .map(String::as_str)
    }

    fn chunk(&self, chunk_index: usize) -> Option<&ChunkRemap> {
        self.chunks.iter().find(|c| c.chunk_index == chunk_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedStructure {
    pub structure: StructureResult,
    pub remap: IdRemapTable,
}

#[derive(Default)]
struct Counter(usize);

impl Counter {
    fn next(&mut self, prefix: &str) -> String {
        self.0 += 1;
        format!("{}_{}", prefix, self.0)
    }
}

fn first_non_empty(slot: &mut String, candidate: &str) {
    if slot.trim().is_empty() && !candidate.trim().is_empty() {
        *slot = candidate.to_string();
    }
}

/// Merges chunk results in chunk order.
///
/// Module, lesson and task IDs are renumbered from shared counters. Parent
/// references are rewritten through the same chunk's mapping; a reference
/// with no match in its chunk is kept as-is. When a chunk repeats a local
/// ID, references resolve to its first occurrence. Identically titled
/// modules are kept separately.
pub fn merge_chunk_results(mut results: Vec<(usize, StructureResult)>) -> MergedStructure {
    results.sort_by_key(|(index, _)| *index);

    let mut merged = StructureResult::default();
    let mut remap = IdRemapTable::default();
    let mut module_ids = Counter::default();
    let mut lesson_ids = Counter::default();
    let mut task_ids = Counter::default();

    for (chunk_index, result) in results {
        first_non_empty(&mut merged.course.title, &result.course.title);
        first_non_empty(&mut merged.course.description, &result.course.description);

        let mut chunk_map = ChunkRemap {
            chunk_index,
            ..Default::default()
        };

        for mut module in result.modules {
            let new_id = module_ids.next("module");
            chunk_map
                .modules
                .entry(std::mem::take(&mut module.id))
                .or_insert_with(|| new_id.clone());
            module.id = new_id;
            merged.modules.push(module);
        }

        for mut lesson in result.lessons {
            if let Some(new_parent) = lesson
                .parent_module
                .as_ref()
                .and_then(|p| chunk_map.modules.get(p))
            {
                lesson.parent_module = Some(new_parent.clone());
            }
            let new_id = lesson_ids.next("lesson");
            chunk_map
                .lessons
                .entry(std::mem::take(&mut lesson.id))
                .or_insert_with(|| new_id.clone());
            lesson.id = new_id;
            merged.lessons.push(lesson);
        }

        for mut task in result.tasks {
            if let Some(new_parent) = task
                .parent_lesson
                .as_ref()
                .and_then(|p| chunk_map.lessons.get(p))
            {
                task.parent_lesson = Some(new_parent.clone());
            }
            let new_id = task_ids.next("task");
            chunk_map
                .tasks
                .entry(std::mem::take(&mut task.id))
                .or_insert_with(|| new_id.clone());
            task.id = new_id;
            merged.tasks.push(task);
        }

        remap.chunks.push(chunk_map);
    }

    MergedStructure {
        structure: merged,
        remap,
    }
}
