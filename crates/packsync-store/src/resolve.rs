use packsync_schema::{ModFile, ModFileKind, ModId};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Picks at most one file per mod id, by declared version.
///
/// Groups whose members are not all mod artifacts pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct PackResolver {
    excluded: BTreeSet<ModId>,
}

impl PackResolver {
    pub fn new(excluded: BTreeSet<ModId>) -> Self {
        Self { excluded }
    }

    pub fn excluded(&self) -> &BTreeSet<ModId> {
        &self.excluded
    }

    pub fn resolve(&self, candidates: Vec<ModFile>) -> Vec<ModFile> {
        let mut order: Vec<ModId> = Vec::new();
        let mut groups: HashMap<ModId, Vec<ModFile>> = HashMap::new();

        for file in candidates {
            let id = file.root_mod_id();
            if self.excluded.contains(&id) {
                debug!("excluding {} (mod id {id})", file.file_name());
                continue;
            }
            groups
                .entry(id.clone())
                .or_insert_with(|| {
                    order.push(id);
                    Vec::new()
                })
                .push(file);
        }

        let mut resolved = Vec::new();
        for id in order {
            let Some(members) = groups.remove(&id) else {
                continue;
            };
            resolved.extend(select_newest(&id, members));
        }
        resolved
    }
}

fn select_newest(id: &ModId, mut members: Vec<ModFile>) -> Vec<ModFile> {
    if members.len() <= 1 || !members.iter().all(|f| f.kind() == ModFileKind::Mod) {
        return members;
    }

    debug!("selecting newest by artifact version for mod id {id}");
    let mut winner = 0;
    for (i, file) in members.iter().enumerate().skip(1) {
        if file.root_version() > members[winner].root_version() {
            winner = i;
        }
    }
    let newest = members.swap_remove(winner);
    debug!(
        "newest file for mod id {id} is {} ({})",
        newest.file_name(),
        newest.root_version().map_or("?", |v| v.as_str())
    );
    vec![newest]
}

#[cfg(test)]
mod tests {
    use super::*;
    use packsync_schema::ModInfo;

    fn jar(name: &str, id: &str, version: &str) -> ModFile {
        ModFile::new(
            format!("/mods/{name}"),
            ModFileKind::Mod,
            vec![ModInfo::new(id, version)],
        )
    }

    fn lib(name: &str, id: &str) -> ModFile {
        ModFile::new(
            format!("/mods/{name}"),
            ModFileKind::Library,
            vec![ModInfo::new(id, "1.0")],
        )
    }

    fn names(files: &[ModFile]) -> Vec<&str> {
        files.iter().map(|f| f.file_name().as_str()).collect()
    }

    #[test]
    fn two_member_group_keeps_max_version() {
        let out = PackResolver::default().resolve(vec![
            jar("jei-2.0.jar", "jei", "2.0"),
            jar("jei-10.0.jar", "jei", "10.0"),
        ]);
        assert_eq!(names(&out), vec!["jei-10.0.jar"]);
    }

    #[test]
    fn three_member_group_tie_keeps_first_max() {
        let out = PackResolver::default().resolve(vec![
            jar("a-1.jar", "a", "1.0"),
            jar("a-2.jar", "a", "2.0"),
            jar("a-2b.jar", "a", "2.0.0"),
        ]);
        assert_eq!(names(&out), vec!["a-2.jar"]);
    }

    #[test]
    fn mixed_group_passes_through() {
        // Library root ids are file names; this mod declares the same id.
        let out = PackResolver::default().resolve(vec![
            jar("x-1.jar", "lib.jar", "1.0"),
            lib("lib.jar", "ignored"),
            jar("y.jar", "y", "1.0"),
        ]);
        assert_eq!(names(&out), vec!["x-1.jar", "lib.jar", "y.jar"]);
    }

    #[test]
    fn exclusion_removes_every_version() {
        let out = PackResolver::new(BTreeSet::from([ModId::new("optifine")])).resolve(vec![
            jar("of-1.jar", "optifine", "1.0"),
            jar("keep.jar", "keep", "1.0"),
            jar("of-2.jar", "optifine", "2.0"),
        ]);
        assert_eq!(names(&out), vec!["keep.jar"]);
    }

    #[test]
    fn exclusion_applies_to_file_name_ids() {
        let out = PackResolver::new(BTreeSet::from([ModId::new("lib.jar")]))
            .resolve(vec![lib("lib.jar", "whatever"), jar("m.jar", "m", "1")]);
        assert_eq!(names(&out), vec!["m.jar"]);
    }

    #[test]
    fn group_order_is_first_seen() {
        let out = PackResolver::default().resolve(vec![
            jar("b-1.jar", "b", "1"),
            jar("a-1.jar", "a", "1"),
            jar("b-2.jar", "b", "2"),
        ]);
        assert_eq!(names(&out), vec!["b-2.jar", "a-1.jar"]);
    }

    #[test]
    fn non_mod_files_never_group_with_each_other() {
        let out = PackResolver::default().resolve(vec![lib("l1.jar", "same"), lib("l2.jar", "same")]);
        assert_eq!(names(&out), vec!["l1.jar", "l2.jar"]);
    }

    #[test]
    fn empty_input_resolves_to_empty() {
        assert!(PackResolver::default().resolve(Vec::new()).is_empty());
    }
}
