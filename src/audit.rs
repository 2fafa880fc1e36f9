//! Production facet selector audit: which selectors declared by
//! `// @production-facet` contracts are not registered on the diamond.

use crate::{
    inspector::ContractInspector,
    sources::{self, ContractRef, DeclFilter},
};
use alloy::{
    primitives::{Address, FixedBytes},
    providers::Provider,
    sol,
    transports::Transport,
};
use anyhow::{Context, Result};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
    str::FromStr,
};
use tracing::{debug, info, warn};

pub type Selector = FixedBytes<4>;

sol! {
    #[sol(rpc)]
    interface IDiamondLoupe {
        struct Facet {
            address facetAddress;
            bytes4[] functionSelectors;
        }

        function facets() external view returns (Facet[] memory);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSelector {
    pub signature: String,
    pub selector: Selector,
    pub origin: ContractRef,
}

/// Selector to the contract that declares it. Later declarations win.
pub type SelectorIndex = HashMap<Selector, ContractRef>;

#[derive(Debug, Clone)]
pub struct AuditReport {
    pub local: Vec<LocalSelector>,
    pub index: SelectorIndex,
    pub onchain: usize,
    pub missing: Vec<LocalSelector>,
}

/// Accepts `abcd1234` or `0xabcd1234`.
pub fn parse_selector(raw: &str) -> Result<Selector> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Selector::from_str(hex).with_context(|| format!("Invalid selector '{}'", raw))
}

/// Selectors of every production facet under `root`, in discovery order.
pub fn collect_local_selectors(
    root: &Path,
    inspector: &impl ContractInspector,
) -> Result<Vec<LocalSelector>> {
    let mut local = Vec::new();

    for file in sources::solidity_files(root)? {
        let contracts = sources::contracts_in_file(&file, DeclFilter::ProductionFacet)?;
        let names: Vec<&str> = contracts.iter().map(|c| c.name.as_str()).collect();
        info!(file = %file.display(), contracts = ?names, "Prod ready contracts");

        for contract in contracts {
            let methods = inspector
                .methods(&contract)
                .with_context(|| format!("Failed to inspect methods of {}", contract))?;
            for (signature, selector) in methods {
                let selector = parse_selector(&selector)
                    .with_context(|| format!("{} in {}", signature, contract))?;
                local.push(LocalSelector {
                    signature,
                    selector,
                    origin: contract.clone(),
                });
            }
        }
    }

    Ok(local)
}

/// Builds the selector to location table, warning when two contracts declare
/// the same selector since only one of them can be routed by the diamond.
pub fn selector_index(local: &[LocalSelector]) -> SelectorIndex {
    let mut index = SelectorIndex::with_capacity(local.len());
    for entry in local {
        if let Some(previous) = index.insert(entry.selector, entry.origin.clone()) {
            if previous != entry.origin {
                warn!(
                    selector = %entry.selector,
                    first = %previous,
                    second = %entry.origin,
                    "Selector declared by more than one facet"
                );
            }
        }
    }
    index
}

/// Local selectors absent from `onchain`, in local order.
pub fn missing_selectors(local: &[LocalSelector], onchain: &HashSet<Selector>) -> Vec<LocalSelector> {
    local
        .iter()
        .filter(|entry| !onchain.contains(&entry.selector))
        .cloned()
        .collect()
}

/// Every selector the diamond currently routes, read through its loupe.
pub async fn onchain_selectors<T, P>(provider: P, diamond: Address) -> Result<HashSet<Selector>>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let loupe = IDiamondLoupe::new(diamond, provider);
    let facets = loupe
        .facets()
        .call()
        .await
        .with_context(|| format!("facets() call on {} failed", diamond))?
        ._0;
    debug!(facets = facets.len(), "read diamond loupe");

    Ok(flatten_facets(facets))
}

/// Union of every facet's selectors.
pub fn flatten_facets(facets: Vec<IDiamondLoupe::Facet>) -> HashSet<Selector> {
    facets
        .into_iter()
        .flat_map(|facet| facet.functionSelectors)
        .collect()
}

pub async fn audit<T, P>(
    facets_root: &Path,
    diamond: Address,
    inspector: &impl ContractInspector,
    provider: P,
) -> Result<AuditReport>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let local = collect_local_selectors(facets_root, inspector)?;
    let index = selector_index(&local);

    let onchain = onchain_selectors(provider, diamond).await?;
    info!(count = onchain.len(), "Existing selectors on diamond");

    let missing = missing_selectors(&local, &onchain);
    for entry in &missing {
        info!(
            selector = %entry.selector,
            signature = %entry.signature,
            location = %entry.origin,
            "Missing selector"
        );
    }

    Ok(AuditReport {
        local,
        index,
        onchain: onchain.len(),
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::{InspectError, MethodTable};
    use serde_json::Value;
    use std::{fs, path::PathBuf};

    fn local(signature: &str, selector: &str, contract: &str) -> LocalSelector {
        LocalSelector {
            signature: signature.to_string(),
            selector: parse_selector(selector).unwrap(),
            origin: ContractRef {
                file: PathBuf::from("src/diamond/facets/Facets.sol"),
                name: contract.to_string(),
            },
        }
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            parse_selector("7a0ed627").unwrap(),
            parse_selector("0x7a0ed627").unwrap()
        );
        assert!(parse_selector("7a0ed6").is_err());
        assert!(parse_selector("zzzzzzzz").is_err());
    }

    #[test]
    fn test_missing_selectors_reports_only_absent() {
        let local = vec![
            local("facets()", "7a0ed627", "LoupeFacet"),
            local("owner()", "8da5cb5b", "OwnershipFacet"),
            local("transferOwnership(address)", "f2fde38b", "OwnershipFacet"),
        ];
        let onchain: HashSet<Selector> = ["7a0ed627", "f2fde38b", "01ffc9a7"]
            .iter()
            .map(|s| parse_selector(s).unwrap())
            .collect();

        let missing = missing_selectors(&local, &onchain);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].signature, "owner()");
        assert_eq!(missing[0].origin.name, "OwnershipFacet");
    }

    #[test]
    fn test_missing_selectors_empty_when_sets_match() {
        let local = vec![
            local("facets()", "7a0ed627", "LoupeFacet"),
            local("owner()", "8da5cb5b", "OwnershipFacet"),
        ];
        let onchain: HashSet<Selector> = local.iter().map(|l| l.selector).collect();
        assert!(missing_selectors(&local, &onchain).is_empty());
    }

    #[test]
    fn test_selector_index_keeps_latest_location() {
        let entries = vec![
            local("owner()", "8da5cb5b", "OwnershipFacet"),
            local("owner()", "8da5cb5b", "LegacyOwnershipFacet"),
            local("facets()", "7a0ed627", "LoupeFacet"),
        ];
        let index = selector_index(&entries);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index[&parse_selector("8da5cb5b").unwrap()].name,
            "LegacyOwnershipFacet"
        );
    }

    fn facet(address: u8, selectors: &[&str]) -> IDiamondLoupe::Facet {
        IDiamondLoupe::Facet {
            facetAddress: Address::repeat_byte(address),
            functionSelectors: selectors.iter().map(|s| parse_selector(s).unwrap()).collect(),
        }
    }

    #[test]
    fn test_flatten_facets_unions_selectors() {
        let onchain = flatten_facets(vec![
            facet(0x01, &["7a0ed627", "cdffacc6"]),
            facet(0x02, &[]),
            facet(0x03, &["cdffacc6", "8da5cb5b"]),
        ]);
        assert_eq!(onchain.len(), 3);
        for raw in ["7a0ed627", "cdffacc6", "8da5cb5b"] {
            assert!(onchain.contains(&parse_selector(raw).unwrap()));
        }
        assert!(flatten_facets(Vec::new()).is_empty());
    }

    #[test]
    fn test_missing_against_flattened_facets() {
        let local = vec![
            local("facets()", "7a0ed627", "LoupeFacet"),
            local("owner()", "8da5cb5b", "OwnershipFacet"),
            local("pause()", "8456cb59", "PauseFacet"),
        ];
        let onchain = flatten_facets(vec![
            facet(0x01, &["7a0ed627"]),
            facet(0x02, &[]),
            facet(0x03, &["7a0ed627", "8da5cb5b"]),
        ]);

        let missing = missing_selectors(&local, &onchain);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].signature, "pause()");
        assert_eq!(missing[0].origin.name, "PauseFacet");
    }

    #[test]
    fn test_missing_duplicate_keeps_each_origin() {
        let local = vec![
            local("owner()", "8da5cb5b", "OwnershipFacet"),
            local("owner()", "8da5cb5b", "LegacyOwnershipFacet"),
        ];
        let missing = missing_selectors(&local, &HashSet::new());
        let origins: Vec<&str> = missing.iter().map(|m| m.origin.name.as_str()).collect();
        assert_eq!(origins, vec!["OwnershipFacet", "LegacyOwnershipFacet"]);
    }

    struct MethodsOnly(HashMap<String, MethodTable>);

    impl ContractInspector for MethodsOnly {
        fn abi(&self, _contract: &ContractRef) -> Result<Vec<Value>, InspectError> {
            Ok(Vec::new())
        }

        fn methods(&self, contract: &ContractRef) -> Result<MethodTable, InspectError> {
            Ok(self.0.get(&contract.name).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_collect_local_selectors_only_production_facets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Facets.sol"),
            "// @production-facet\ncontract LoupeFacet {\n}\n\ncontract DraftFacet {\n}\n",
        )
        .unwrap();

        let inspector = MethodsOnly(HashMap::from([
            (
                "LoupeFacet".to_string(),
                MethodTable::from([("facets()".to_string(), "7a0ed627".to_string())]),
            ),
            (
                "DraftFacet".to_string(),
                MethodTable::from([("draft()".to_string(), "0b1c2d3e".to_string())]),
            ),
        ]));

        let local = collect_local_selectors(dir.path(), &inspector).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].signature, "facets()");
        assert_eq!(local[0].origin.name, "LoupeFacet");
        assert_eq!(local[0].origin.file, dir.path().join("Facets.sol"));
    }

    #[test]
    fn test_collect_local_selectors_rejects_bad_selector() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Facets.sol"),
            "// @production-facet\ncontract LoupeFacet {\n}\n",
        )
        .unwrap();
        let inspector = MethodsOnly(HashMap::from([(
            "LoupeFacet".to_string(),
            MethodTable::from([("facets()".to_string(), "not-hex".to_string())]),
        )]));

        assert!(collect_local_selectors(dir.path(), &inspector).is_err());
    }
}
