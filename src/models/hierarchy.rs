use serde::{Deserialize, Serialize};

/// Node key of every region's root row.
pub const ROOT_KEY: &str = "total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub id: String,
    pub name: String,
    pub children: Vec<LeafCategory>,
}

/// The fixed two-level category tree used under every region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub groups: Vec<CategoryGroup>,
}

impl Hierarchy {
    pub fn new(groups: Vec<CategoryGroup>) -> Self {
        Self { groups }
    }

    pub fn retail() -> Self {
        Self::new(vec![
            group(
                "fresh_dept",
                "Fresh",
                &[
                    ("bakery", "Bakery"),
                    ("dairy", "Dairy & Eggs"),
                    ("chilled", "Chilled"),
                    ("meat", "Meat"),
                    ("produce", "Fruit & Vegetables"),
                ],
            ),
            group(
                "standard_dept",
                "Standard",
                &[
                    ("frozen", "Frozen"),
                    ("wine", "Wine & Spirits"),
                    ("breakfast", "Breakfast"),
                    ("staples", "Rice, Flour & Oil"),
                    ("drinks", "Soft Drinks"),
                    ("snacks", "Snacks"),
                    ("personal_care", "Personal Care"),
                    ("household", "Household Cleaning"),
                ],
            ),
        ])
    }

    pub fn group(&self, id: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn leaf(&self, id: &str) -> Option<&LeafCategory> {
        self.leaves().find(|l| l.id == id)
    }

    pub fn group_of(&self, leaf_id: &str) -> Option<&CategoryGroup> {
        self.groups
            .iter()
            .find(|g| g.children.iter().any(|c| c.id == leaf_id))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &LeafCategory> {
        self.groups.iter().flat_map(|g| g.children.iter())
    }

    /// Every node key: the root, then each group followed by its leaves.
    pub fn node_keys(&self) -> Vec<&str> {
        let mut keys = vec![ROOT_KEY];
        for g in &self.groups {
            keys.push(&g.id);
            keys.extend(g.children.iter().map(|c| c.id.as_str()));
        }
        keys
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::retail()
    }
}

fn group(id: &str, name: &str, children: &[(&str, &str)]) -> CategoryGroup {
    CategoryGroup {
        id: id.to_string(),
        name: name.to_string(),
        children: children
            .iter()
            .map(|(id, name)| LeafCategory {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retail_shape() {
        let h = Hierarchy::retail();
        assert_eq!(h.groups.len(), 2);
        assert_eq!(h.leaves().count(), 13);
        assert_eq!(h.group_of("meat").map(|g| g.id.as_str()), Some("fresh_dept"));
        assert_eq!(h.group_of("snacks").map(|g| g.id.as_str()), Some("standard_dept"));
        assert!(h.group_of("fresh_dept").is_none());
        assert_eq!(h.node_keys().len(), 1 + 2 + 13);
        assert_eq!(h.node_keys()[0], ROOT_KEY);
    }
}
