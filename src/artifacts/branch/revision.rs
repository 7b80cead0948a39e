use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, resolve_alias};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;

/// Tags can point at tags; give up after this many hops
const MAX_TAG_DEPTH: usize = 8;

/// A revision specification identifying a commit.
///
/// Supports:
/// - Ref names: `main`, `feature/x`, `v1.0`, `HEAD`
/// - Aliases: `@` (resolves to `HEAD`)
/// - Full or abbreviated (4+ characters) object ids, tried when no ref matches
/// - Parent notation: `<revision>^`
/// - Ancestor notation: `<revision>~<n>`
#[derive(Debug, Clone)]
pub enum Revision {
    /// A ref, or an object id resolved as fallback
    Ref(BranchName),
    /// The Nth first-parent ancestor of a revision
    Ancestor(Box<Revision>, usize),
    /// The first parent of a revision
    Parent(Box<Revision>),
}

impl Revision {
    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let branch_name = BranchName::try_parse(resolve_alias(revision).to_string())?;
            Ok(Revision::Ref(branch_name))
        }
    }

    /// Commit id the revision names; None when it names an unborn branch
    /// or walks past a root commit
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<Option<ObjectId>> {
        match self {
            Revision::Ref(branch_name) => match repository.refs().read_ref(branch_name) {
                Ok(Some(oid)) => Self::peel_to_commit(oid, repository).map(Some),
                Ok(None) => Ok(None),
                Err(ref_err) => {
                    if Self::looks_like_oid(branch_name.as_ref()) {
                        Self::resolve_oid(branch_name.as_ref(), repository).map(Some)
                    } else {
                        Err(ref_err)
                    }
                }
            },
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_commit_parent(
        oid: Option<ObjectId>,
        repository: &Repository,
    ) -> anyhow::Result<Option<ObjectId>> {
        match oid {
            Some(oid) => {
                let commit = repository
                    .database()
                    .parse_object_as_commit(&oid)?
                    .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", oid))?;

                Ok(commit.parent().cloned())
            }
            None => Ok(None),
        }
    }

    fn peel_to_commit(mut oid: ObjectId, repository: &Repository) -> anyhow::Result<ObjectId> {
        for _ in 0..MAX_TAG_DEPTH {
            match repository.database().read_tag_target(&oid)? {
                Some(target) => oid = target,
                None => {
                    Self::validate_oid_is_commit(&oid, repository)?;
                    return Ok(oid);
                }
            }
        }

        anyhow::bail!("tag chain too deep at {}", oid)
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if oid_str.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(oid_str.to_string())?;
            return Self::peel_to_commit(oid, repository);
        }

        let candidates = repository
            .database()
            .find_objects_by_prefix(oid_str)?
            .into_iter()
            .filter(|oid| {
                repository
                    .database()
                    .get_object_type(oid)
                    .map(|object_type| matches!(object_type, ObjectType::Commit | ObjectType::Tag))
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();

        match candidates.as_slice() {
            [] => anyhow::bail!(
                "ambiguous argument '{}': unknown revision or path not in the working tree",
                oid_str
            ),
            [oid] => Self::peel_to_commit(oid.clone(), repository),
            _ => {
                let mut error_msg = format!(
                    "short SHA1 {} is ambiguous\nhint: The candidates are:",
                    oid_str
                );
                for oid in &candidates {
                    error_msg.push_str(&format!("\nhint:   {}", oid.to_short_oid()));
                }
                anyhow::bail!(error_msg)
            }
        }
    }

    fn validate_oid_is_commit(oid: &ObjectId, repository: &Repository) -> anyhow::Result<()> {
        let obj_type = repository
            .database()
            .get_object_type(oid)
            .with_context(|| format!("object {} not found", oid))?;

        if obj_type != ObjectType::Commit {
            anyhow::bail!(
                "object {} is a {}, not a commit",
                oid.to_short_oid(),
                obj_type
            );
        }

        Ok(())
    }

    fn looks_like_oid(s: &str) -> bool {
        s.len() >= 4 && s.len() <= OBJECT_ID_LENGTH && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}
