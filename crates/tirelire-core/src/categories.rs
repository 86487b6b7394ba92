//! Category registry: the ordered category names of each type

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::types::CategoryType;

/// Category receiving the automatic balance carry-forward
pub const SOLDE_CATEGORY: &str = "Solde M-1";

fn default_names(category_type: CategoryType) -> &'static [&'static str] {
    match category_type {
        CategoryType::Revenus => &[
            "Salaire",
            "Prime",
            "Remboursement",
            "Intérêts",
            "Rbsmt Sécu",
            "Rbsmt Mutuelle",
            "Autres revenus",
            SOLDE_CATEGORY,
        ],
        CategoryType::ChargesFixes => &[
            "Portable",
            "Fibre",
            "EDF",
            "Eau",
            "Crédit maison",
            "Assurance",
            "Taxe Foncière",
            "Microsoft",
            "Ménage",
            "PAC",
            "Ursaaf",
            "Mutuelle",
            "Autres fixes",
        ],
        CategoryType::Essentiel => &[
            "Alimentation",
            "Essence",
            "Tabac",
            "Gaz",
            "Santé/Pharma",
            "Autres essentiels",
        ],
        CategoryType::Extras => &[
            "Shopping",
            "Bar/Resto",
            "Bricolage",
            "Beauté",
            "Cadeaux",
            "Animaux",
            "Autres Extras",
        ],
        CategoryType::Epargne => &[
            "Fin de mois",
            "Pets/Home/Auto",
            "Anniv/Noël",
            "Vacances",
            "Santé",
            "Travaux",
            "Urgences",
        ],
    }
}

/// Default category names for one type
pub fn default_categories(category_type: CategoryType) -> Vec<String> {
    default_names(category_type)
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Mapping type → ordered list of unique category names
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRegistry {
    categories: BTreeMap<CategoryType, Vec<String>>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self {
            categories: CategoryType::ALL
                .iter()
                .map(|t| (*t, default_categories(*t)))
                .collect(),
        }
    }
}

impl CategoryRegistry {
    /// Registry with no category at all
    pub fn empty() -> Self {
        Self {
            categories: CategoryType::ALL.iter().map(|t| (*t, Vec::new())).collect(),
        }
    }

    /// Build from per-type lists; blank names and duplicates are dropped
    pub fn from_lists(lists: impl IntoIterator<Item = (CategoryType, Vec<String>)>) -> Self {
        let mut registry = Self::empty();
        for (category_type, names) in lists {
            let slot = registry.categories.entry(category_type).or_default();
            slot.clear();
            for name in names {
                let name = name.trim();
                if !name.is_empty() && !slot.iter().any(|n| n == name) {
                    slot.push(name.to_string());
                }
            }
        }
        registry
    }

    /// Category names of a type, in order
    pub fn categories(&self, category_type: CategoryType) -> &[String] {
        self.categories
            .get(&category_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, category_type: CategoryType, name: &str) -> bool {
        self.categories(category_type).iter().any(|n| n == name)
    }

    /// Iterate over every type in display order
    pub fn iter(&self) -> impl Iterator<Item = (CategoryType, &[String])> + '_ {
        CategoryType::ALL
            .iter()
            .map(move |t| (*t, self.categories(*t)))
    }

    /// Sorted union of all names, for filters spanning every type
    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .values()
            .flat_map(|names| names.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Fail unless the category is registered
    pub fn require(&self, category_type: CategoryType, name: &str) -> CoreResult<()> {
        if self.contains(category_type, name) {
            Ok(())
        } else {
            Err(CoreError::CategoryNotFound {
                category_type,
                name: name.to_string(),
            })
        }
    }

    /// Append a category; returns the trimmed name
    pub fn add(&mut self, category_type: CategoryType, name: &str) -> CoreResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Le nom de la catégorie est vide"));
        }
        if self.contains(category_type, name) {
            return Err(CoreError::DuplicateEntry {
                entry: name.to_string(),
            });
        }
        self.categories
            .entry(category_type)
            .or_default()
            .push(name.to_string());
        Ok(name.to_string())
    }

    /// Rename in place, keeping the position; returns the trimmed new name
    pub fn rename(&mut self, category_type: CategoryType, old: &str, new: &str) -> CoreResult<String> {
        let new = new.trim();
        if new.is_empty() {
            return Err(CoreError::validation("Le nom de la catégorie est vide"));
        }
        if new == old {
            return Err(CoreError::validation("Le nouveau nom est identique à l'ancien"));
        }
        if self.contains(category_type, new) {
            return Err(CoreError::DuplicateEntry {
                entry: new.to_string(),
            });
        }
        let slot = self
            .categories
            .get_mut(&category_type)
            .and_then(|names| names.iter_mut().find(|n| n.as_str() == old))
            .ok_or_else(|| CoreError::CategoryNotFound {
                category_type,
                name: old.to_string(),
            })?;
        *slot = new.to_string();
        Ok(new.to_string())
    }

    pub fn remove(&mut self, category_type: CategoryType, name: &str) -> CoreResult<()> {
        self.require(category_type, name)?;
        if let Some(names) = self.categories.get_mut(&category_type) {
            names.retain(|n| n != name);
        }
        Ok(())
    }

    /// Restore the default lists
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
