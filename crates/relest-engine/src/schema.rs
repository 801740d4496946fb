//! Schema-level composition of attribute networks.
//!
//! A [`SchemaNetwork`] keeps one [`AttributeNetwork`] per relation. A
//! relation with foreign keys is fitted after the relations it references,
//! on a star join that adds each referenced relation's root attribute as a
//! column named `"{relation}.{root}"`. At query time the referenced networks
//! are grafted onto the referencing one below that column, and the
//! selectivities of the resulting networks are multiplied, assuming
//! independence between them.

use hashbrown::HashSet;
use indexmap::IndexMap;
use rayon::prelude::*;
use relest_common::types::Relation;
use relest_common::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::network::{AttributeNetwork, Conditions};

/// One attribute network per relation, linked along foreign keys.
///
/// # Examples
///
/// ```
/// use relest_common::types::{Relation, Value};
/// use relest_engine::{Conditions, Config, SchemaNetwork};
///
/// let customer = Relation::new("customer")
///     .with_column("id", [1i64, 2, 3, 4])?
///     .with_column("country", ["SE", "SE", "FR", "FR"])?;
/// let orders = Relation::new("orders")
///     .with_column("customer_id", [1i64, 1, 2, 3, 4, 4])?
///     .with_column("status", ["open", "open", "open", "done", "done", "done"])?
///     .with_foreign_key("customer_id", "customer", "id");
///
/// let schema = SchemaNetwork::fit(&[customer, orders], &Config::new())?;
///
/// let mut conditions = Conditions::new();
/// conditions.insert("country".to_string(), Value::from("FR"));
/// let selectivity = schema.query(&["customer"], &conditions)?;
/// assert!((selectivity - 0.5).abs() < 1e-9);
/// # Ok::<(), relest_common::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNetwork {
    networks: IndexMap<String, AttributeNetwork>,
    extensions: IndexMap<String, Vec<String>>,
    passes: usize,
}

/// A relation ready to be fitted, star-joined where needed.
struct Job {
    name: String,
    relation: Relation,
    extensions: Vec<String>,
}

impl SchemaNetwork {
    /// Fits one attribute network per relation.
    ///
    /// Works in passes: each pass fits every pending relation whose
    /// referenced relations all have a network already. Relations that
    /// become ready in the same pass are fitted concurrently unless
    /// `config.parallel` is off. A foreign key to a relation whose network
    /// models no attribute is not joined.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownRelation`] if a foreign key references a relation
    ///   that is not given
    /// - [`Error::CyclicForeignKeys`] if a pass makes no progress
    /// - any error from fitting the individual networks
    pub fn fit(relations: &[Relation], config: &Config) -> Result<Self> {
        let by_name: IndexMap<&str, &Relation> = relations.iter().map(|r| (r.name(), r)).collect();
        for fk in relations.iter().flat_map(Relation::foreign_keys) {
            if !by_name.contains_key(fk.to_relation.as_str()) {
                return Err(Error::UnknownRelation(fk.to_relation.clone()));
            }
        }

        let mut schema = Self::default();
        // Fitted relations as they were star-joined; their roots may be joined columns
        let mut joined: IndexMap<String, Relation> = IndexMap::new();
        let mut pending: Vec<&str> = by_name.keys().copied().collect();

        while !pending.is_empty() {
            let (ready, waiting): (Vec<&str>, Vec<&str>) = pending.iter().copied().partition(|name| {
                by_name[*name]
                    .foreign_keys()
                    .iter()
                    .all(|fk| schema.networks.contains_key(&fk.to_relation))
            });
            if ready.is_empty() {
                return Err(Error::CyclicForeignKeys {
                    pending: waiting.iter().map(ToString::to_string).collect(),
                });
            }
            schema.passes += 1;
            tracing::debug!(pass = schema.passes, ready = ?ready, waiting = waiting.len(), "fitting pass");

            let jobs = ready
                .iter()
                .map(|name| schema.star_join(by_name[*name], &joined))
                .collect::<Result<Vec<_>>>()?;

            let fit = |job: &Job| {
                AttributeNetwork::fit(&job.relation, config).map(|network| {
                    tracing::info!(
                        relation = %job.name,
                        attributes = network.len(),
                        extensions = ?job.extensions,
                        "fitted attribute network"
                    );
                    network
                })
            };
            let fitted: Vec<Result<AttributeNetwork>> = if config.parallel {
                jobs.par_iter().map(fit).collect()
            } else {
                jobs.iter().map(fit).collect()
            };

            for (job, network) in jobs.into_iter().zip(fitted) {
                schema.networks.insert(job.name.clone(), network?);
                if !job.extensions.is_empty() {
                    schema.extensions.insert(job.name.clone(), job.extensions);
                }
                joined.insert(job.name, job.relation);
            }
            pending = waiting;
        }

        Ok(schema)
    }

    /// Joins the root attribute of every referenced relation onto `relation`.
    ///
    /// Referenced relations are read from `joined`, the star joins they were
    /// fitted on: a root can be a joined column.
    fn star_join(&self, relation: &Relation, joined: &IndexMap<String, Relation>) -> Result<Job> {
        let mut star = relation.clone();
        let mut extensions: Vec<String> = Vec::new();

        for fk in relation.foreign_keys() {
            let target = fk.to_relation.as_str();
            let root = self.networks.get(target).and_then(AttributeNetwork::root);
            let (Some(root), Some(other)) = (root, joined.get(target)) else {
                tracing::warn!(foreign_key = %fk, "referenced relation models no attribute, not joining");
                continue;
            };
            if extensions.iter().any(|e| e == target) {
                tracing::warn!(foreign_key = %fk, "relation already joined, not joining again");
                continue;
            }
            let alias = format!("{target}.{root}");
            star = star.left_join_column(&fk.from_column, other, &fk.to_column, root, &alias)?;
            extensions.push(target.to_string());
        }

        Ok(Job {
            name: relation.name().to_string(),
            relation: star,
            extensions,
        })
    }

    /// Estimates the selectivity of `conditions` over the join of
    /// `relation_names`.
    ///
    /// Networks of the named relations are first spliced along the
    /// recorded extensions: the referenced network is renamed with its
    /// relation as prefix and its root's children are grafted below the
    /// joined column of the referencing network. A referenced network that
    /// cannot be grafted stays separate. Each condition applies to every
    /// remaining network that models its attribute, either by its name in
    /// the network or qualified as `"{relation}.{attribute}"`. The result is
    /// the product of the networks' selectivities.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownRelation`] if a relation name has no network
    /// - [`Error::UnknownAttribute`] if a condition matches no network
    /// - [`Error::UnresolvableExtensions`] if splicing makes no progress
    /// - any error from querying the individual networks
    pub fn query<S: AsRef<str>>(&self, relation_names: &[S], conditions: &Conditions) -> Result<f64> {
        let networks = self.splice(relation_names)?;

        let mut matched: HashSet<&str> = HashSet::new();
        let mut selectivity = 1.0;
        for (relation, network) in &networks {
            let mut own = Conditions::new();
            for (key, value) in conditions {
                let attribute = if network.contains(key) {
                    Some(key.as_str())
                } else {
                    key.strip_prefix(relation.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        .filter(|attr| network.contains(attr))
                };
                if let Some(attribute) = attribute {
                    own.insert(attribute.to_string(), value.clone());
                    matched.insert(key.as_str());
                }
            }
            let estimate = network.query(&own)?;
            tracing::debug!(%relation, conditions = own.len(), estimate, "queried network");
            selectivity *= estimate;
        }

        if let Some(unknown) = conditions.keys().find(|k| !matched.contains(k.as_str())) {
            return Err(Error::UnknownAttribute(unknown.clone()));
        }
        Ok(selectivity)
    }

    /// Restricts the model to `relation_names` and grafts extensions.
    fn splice<S: AsRef<str>>(&self, relation_names: &[S]) -> Result<IndexMap<String, AttributeNetwork>> {
        let mut networks: IndexMap<String, AttributeNetwork> = IndexMap::new();
        for name in relation_names {
            let name = name.as_ref();
            let network = self
                .networks
                .get(name)
                .ok_or_else(|| Error::UnknownRelation(name.to_string()))?;
            networks.insert(name.to_string(), network.clone());
        }

        let mut extensions: IndexMap<&str, Vec<&str>> = self
            .extensions
            .iter()
            .filter(|(name, _)| networks.contains_key(*name))
            .map(|(name, related)| {
                let related = related
                    .iter()
                    .map(String::as_str)
                    .filter(|r| networks.contains_key(*r))
                    .collect::<Vec<_>>();
                (name.as_str(), related)
            })
            .filter(|(_, related)| !related.is_empty())
            .collect();

        while !extensions.is_empty() {
            let ready: Vec<&str> = extensions
                .iter()
                .filter(|(_, related)| related.iter().all(|r| !extensions.contains_key(r)))
                .map(|(name, _)| *name)
                .collect();
            if ready.is_empty() {
                return Err(Error::UnresolvableExtensions {
                    pending: extensions.keys().map(ToString::to_string).collect(),
                });
            }

            for name in ready {
                for other in extensions.shift_remove(name).unwrap_or_default() {
                    let Some(guest) = networks.get(other) else {
                        continue;
                    };
                    let renamed = guest.with_prefix(other);
                    let Some(host) = networks.get_mut(name) else {
                        continue;
                    };
                    if host.graft(&renamed)? {
                        networks.shift_remove(other);
                        tracing::debug!(host = name, guest = other, "spliced network");
                    } else {
                        tracing::debug!(host = name, guest = other, "join column not modelled, keeping network separate");
                    }
                }
            }
        }

        Ok(networks)
    }

    /// Number of passes the last [`fit`](Self::fit) needed.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Relation names, in fitting order.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }

    /// Network of a relation.
    #[must_use]
    pub fn network(&self, relation: &str) -> Option<&AttributeNetwork> {
        self.networks.get(relation)
    }

    /// Every network, keyed by relation name.
    #[must_use]
    pub fn networks(&self) -> &IndexMap<String, AttributeNetwork> {
        &self.networks
    }

    /// Relations whose root attribute was joined into `relation`.
    #[must_use]
    pub fn extensions(&self, relation: &str) -> &[String] {
        self.extensions.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BucketConfig;
    use relest_common::types::Value;

    fn config() -> Config {
        Config::new().with_buckets(BucketConfig::uniform(10, 0)).sequential()
    }

    fn conditions(items: &[(&str, Value)]) -> Conditions {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn customer() -> Relation {
        Relation::new("customer")
            .with_column("id", [1i64, 2, 3, 4])
            .unwrap()
            .with_column("country", ["SE", "SE", "FR", "FR"])
            .unwrap()
            .with_column("tier", ["gold", "gold", "basic", "basic"])
            .unwrap()
    }

    fn orders() -> Relation {
        Relation::new("orders")
            .with_column("id", [10i64, 11, 12, 13, 14, 15])
            .unwrap()
            .with_column("customer_id", [1i64, 1, 2, 3, 4, 4])
            .unwrap()
            .with_column("status", ["open", "open", "open", "done", "done", "done"])
            .unwrap()
            .with_foreign_key("customer_id", "customer", "id")
    }

    #[test]
    fn test_fit_records_extensions() {
        let schema = SchemaNetwork::fit(&[orders(), customer()], &config()).unwrap();
        assert_eq!(schema.passes(), 2);
        assert_eq!(schema.relations().collect::<Vec<_>>(), vec!["customer", "orders"]);
        assert_eq!(schema.extensions("orders"), ["customer".to_string()]);
        assert!(schema.extensions("customer").is_empty());
        let orders = schema.network("orders").unwrap();
        assert!(orders.contains("customer.country"));
        assert!(!orders.contains("customer_id"));
    }

    #[test]
    fn test_fit_unknown_relation() {
        let err = SchemaNetwork::fit(&[orders()], &config()).unwrap_err();
        assert_eq!(err, Error::UnknownRelation("customer".to_string()));
    }

    #[test]
    fn test_fit_self_reference_is_cyclic() {
        let employee = Relation::new("employee")
            .with_column("id", [1i64, 2, 3])
            .unwrap()
            .with_column("manager", [1i64, 1, 2])
            .unwrap()
            .with_column("team", ["a", "a", "b"])
            .unwrap()
            .with_foreign_key("manager", "employee", "id");
        let err = SchemaNetwork::fit(&[employee], &config()).unwrap_err();
        assert_eq!(
            err,
            Error::CyclicForeignKeys {
                pending: vec!["employee".to_string()]
            }
        );
    }

    #[test]
    fn test_query_single_relation() {
        let schema = SchemaNetwork::fit(&[customer(), orders()], &config()).unwrap();
        let s = schema
            .query(&["customer"], &conditions(&[("country", "SE".into())]))
            .unwrap();
        assert!((s - 0.5).abs() < 1e-12);
        // Qualified names work for unspliced relations
        let s = schema
            .query(&["customer"], &conditions(&[("customer.tier", "gold".into())]))
            .unwrap();
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_query_spliced() {
        let schema = SchemaNetwork::fit(&[customer(), orders()], &config()).unwrap();
        let s = schema
            .query(
                &["orders", "customer"],
                &conditions(&[("customer.country", "FR".into()), ("status", "done".into())]),
            )
            .unwrap();
        // Every FR order is done: 3 of 6 orders
        assert!((s - 0.5).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn test_query_without_extension_partner() {
        let schema = SchemaNetwork::fit(&[customer(), orders()], &config()).unwrap();
        let s = schema
            .query(&["orders"], &conditions(&[("status", "open".into())]))
            .unwrap();
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_query_errors() {
        let schema = SchemaNetwork::fit(&[customer(), orders()], &config()).unwrap();
        assert_eq!(
            schema.query(&["nope"], &Conditions::new()).unwrap_err(),
            Error::UnknownRelation("nope".to_string())
        );
        assert_eq!(
            schema
                .query(&["customer"], &conditions(&[("status", "open".into())]))
                .unwrap_err(),
            Error::UnknownAttribute("status".to_string())
        );
    }

    #[test]
    fn test_unresolvable_extensions() {
        let mut schema = SchemaNetwork::fit(&[customer(), orders()], &config()).unwrap();
        schema
            .extensions
            .insert("customer".to_string(), vec!["orders".to_string()]);
        let err = schema
            .query(&["orders", "customer"], &Conditions::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvableExtensions { .. }));
    }

    #[test]
    fn test_parallel_fit_matches_sequential() {
        let relations = [customer(), orders()];
        let sequential = SchemaNetwork::fit(&relations, &config()).unwrap();
        let parallel = SchemaNetwork::fit(&relations, &Config { parallel: true, ..config() }).unwrap();
        assert_eq!(sequential, parallel);
    }
}
