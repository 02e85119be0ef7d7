//! Generation of the three product options shown during the conjoint stage.

use rand::{Rng, seq::SliceRandom};

use crate::dao::models::{FeatureEntity, ProductOptionEntity};

/// Number of options generated per game.
pub const OPTION_COUNT: usize = 3;
/// Features bundled into each option.
pub const FEATURES_PER_OPTION: usize = 5;

/// Build the three conjoint product options for a new game.
///
/// The catalog is shuffled uniformly (Fisher–Yates, not a comparator trick)
/// and the first fifteen features are partitioned into three consecutive
/// groups of five, labelled "Product A" through "Product C". The options are
/// therefore pairwise disjoint; whatever remains of the catalog is unused for
/// this game.
pub fn generate_product_options(
    catalog: &[FeatureEntity],
    rng: &mut impl Rng,
) -> Vec<ProductOptionEntity> {
    let mut names: Vec<&str> = catalog.iter().map(|f| f.name.as_str()).collect();
    names.shuffle(rng);

    (0..OPTION_COUNT)
        .map(|index| {
            let start = (index * FEATURES_PER_OPTION).min(names.len());
            let end = (start + FEATURES_PER_OPTION).min(names.len());
            let features = names[start..end]
                .iter()
                .map(|name| (*name).to_owned())
                .collect();
            ProductOptionEntity {
                id: index,
                // 'A', 'B', 'C'
                name: format!("Product {}", char::from(b'A' + index as u8)),
                features,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn catalog() -> Vec<FeatureEntity> {
        (0..20)
            .map(|i| FeatureEntity {
                name: format!("Feature {i}"),
                category: "Test".into(),
            })
            .collect()
    }

    #[test]
    fn options_are_disjoint_groups_of_five_from_the_catalog() {
        let catalog = catalog();
        let catalog_names: HashSet<_> = catalog.iter().map(|f| f.name.clone()).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let options = generate_product_options(&catalog, &mut rng);
        assert_eq!(options.len(), 3);

        let mut seen = HashSet::new();
        for (index, option) in options.iter().enumerate() {
            assert_eq!(option.id, index);
            assert_eq!(option.features.len(), 5);
            for feature in &option.features {
                assert!(catalog_names.contains(feature), "feature outside catalog");
                assert!(seen.insert(feature.clone()), "feature shared across options");
            }
        }
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn options_are_labelled_sequentially() {
        let mut rng = StdRng::seed_from_u64(1);
        let options = generate_product_options(&catalog(), &mut rng);
        let labels: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(labels, vec!["Product A", "Product B", "Product C"]);
    }

    #[test]
    fn same_seed_reproduces_the_same_options() {
        let catalog = catalog();
        let a = generate_product_options(&catalog, &mut StdRng::seed_from_u64(99));
        let b = generate_product_options(&catalog, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
