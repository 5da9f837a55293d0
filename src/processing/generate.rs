//! One generation run over a whole config.

use super::{build_topology, find_topology, peer_with, ResourceGraph};
use crate::config::GeneratorConfig;
use crate::error::TopologyError;
use crate::models::{PeeringLink, Subnet, Topology};
use crate::provider::ProviderQuery;
use indexmap::IndexMap;

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct Generation {
    /// Emitted resources in build order.
    pub graph: ResourceGraph,
    /// Built and looked-up networks, in config order.
    pub topologies: IndexMap<String, Topology>,
    pub peerings: Vec<PeeringLink>,
}

fn topology<'a>(
    topologies: &'a IndexMap<String, Topology>,
    name: &str,
) -> Result<&'a Topology, TopologyError> {
    topologies.get(name).ok_or_else(|| {
        TopologyError::Configuration(format!(
            "peering refers to {name}, which is neither built nor looked up"
        ))
    })
}

fn narrowed(
    topology: &Topology,
    groups: Option<&[String]>,
) -> Result<Option<Vec<Subnet>>, TopologyError> {
    groups.map(|g| topology.subnets_in(g)).transpose()
}

fn insert(
    topologies: &mut IndexMap<String, Topology>,
    topology: Topology,
) -> Result<(), TopologyError> {
    if topologies.contains_key(&topology.name) {
        return Err(TopologyError::Configuration(format!(
            "network {} is listed more than once",
            topology.name
        )));
    }
    topologies.insert(topology.name.clone(), topology);
    Ok(())
}

/// Build every configured network, look up the existing ones, then peer.
///
/// Stops at the first error; nothing from a failed run should be used.
pub fn generate(
    config: &GeneratorConfig,
    provider: &dyn ProviderQuery,
) -> Result<Generation, TopologyError> {
    log::info!(
        "#Start generate() networks={} existing={} peerings={}",
        config.networks.len(),
        config.existing_networks.len(),
        config.peerings.len()
    );
    let mut run = Generation::default();

    for network in &config.networks {
        let (azs, options) = network.resolve(provider)?;
        let topology = build_topology(
            &mut run.graph,
            &network.name,
            network.cidr,
            &azs,
            network.subnets.as_ref(),
            &options,
        )?;
        insert(&mut run.topologies, topology)?;
    }

    for name in &config.existing_networks {
        let topology = find_topology(provider, name)?;
        insert(&mut run.topologies, topology)?;
    }

    for peering in &config.peerings {
        let ours = topology(&run.topologies, &peering.from)?;
        let theirs = topology(&run.topologies, &peering.to)?;
        let our_subnets = narrowed(ours, peering.our_groups.as_deref())?;
        let their_subnets = narrowed(theirs, peering.their_groups.as_deref())?;
        let link = peer_with(
            &mut run.graph,
            ours,
            theirs,
            our_subnets.as_deref(),
            their_subnets.as_deref(),
        )?;
        run.peerings.push(link);
    }

    log::info!(
        "Generated {} resources for {} topologies",
        run.graph.len(),
        run.topologies.len()
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeeringConfig;
    use crate::models::ResourceKind;
    use crate::provider::SnapshotProvider;

    const TEST_CONFIG: &str = "src/tests/test_data/network_config_01.json";
    const TEST_SNAPSHOT: &str = "src/tests/test_data/provider_snapshot_01.json";

    fn load() -> (GeneratorConfig, SnapshotProvider) {
        (
            GeneratorConfig::load(TEST_CONFIG).unwrap(),
            SnapshotProvider::from_file(TEST_SNAPSHOT).unwrap(),
        )
    }

    #[test]
    fn test_generate_narrows_peering_groups() {
        let (config, provider) = load();
        let run = generate(&config, &provider).unwrap();

        assert_eq!(
            run.topologies.keys().collect::<Vec<_>>(),
            vec!["staging", "tools", "legacy"]
        );
        let link = &run.peerings[0];
        // one route table per private subnet of staging
        assert_eq!(link.our_route_tables.len(), 3);
        assert_eq!(
            link.their_route_tables
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
            vec!["rtb-db", "rtb-private-a", "rtb-private-b"]
        );
        assert!(run
            .graph
            .get(ResourceKind::AwsVpcPeeringConnection, "staging-to-legacy")
            .is_some());
    }

    #[test]
    fn test_unknown_peering_target() {
        let (mut config, provider) = load();
        config.peerings.push(PeeringConfig {
            from: "tools".to_string(),
            to: "prod".to_string(),
            our_groups: None,
            their_groups: None,
        });
        assert!(matches!(
            generate(&config, &provider),
            Err(TopologyError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_peering_group() {
        let (mut config, provider) = load();
        config.peerings[0].our_groups = Some(vec!["privte".to_string()]);
        let expected = "network staging has no subnet group 'privte'".to_string();
        let err = generate(&config, &provider).unwrap_err();
        assert_eq!(err, TopologyError::Configuration(expected));

        let (mut config, provider) = load();
        config.peerings[0].their_groups = Some(vec!["private".to_string(), "web".to_string()]);
        assert!(matches!(
            generate(&config, &provider),
            Err(TopologyError::Configuration(msg)) if msg.contains("legacy")
        ));
    }

    #[test]
    fn test_empty_group_list_adds_no_routes() {
        let (mut config, provider) = load();
        config.peerings[0].their_groups = Some(vec![]);
        let run = generate(&config, &provider).unwrap();
        assert!(run.peerings[0].their_route_tables.is_empty());
        assert_eq!(run.peerings[0].our_route_tables.len(), 3);
    }

    #[test]
    fn test_network_listed_twice() {
        let (mut config, provider) = load();
        config.existing_networks.push("legacy".to_string());
        assert!(matches!(
            generate(&config, &provider),
            Err(TopologyError::Configuration(_))
        ));
    }
}
