//! DNS records whose value is only known after the gateway stage.
//!
//! Records are planned before anything is deployed, pointing at
//! [`RecordValue::Pending`] for the owning region. Once every region's
//! gateway subdomain is known, [`resolve_placeholders`] turns the plan into
//! records carrying plain addresses, the only shape the DNS collaborator
//! accepts.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UnresolvedPlaceholder;
use crate::types::{RecordStatus, RecordType, RegionConfig};

/// Subdomain used when the domain check reports none.
pub const ROOT_SUBDOMAIN: &str = "@";

/// Outcome of the domain-check collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedDomain {
    /// Registrable domain, e.g. `example.com`.
    pub domain: String,
    /// Host part, e.g. `www` for `www.example.com`.
    pub sub_domain: Option<String>,
}

/// Value of a planned record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum RecordValue {
    /// Waiting on the gateway subdomain of this region.
    Pending(String),
    Resolved(String),
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Pending(region) => write!(f, "pending:{region}"),
            RecordValue::Resolved(address) => f.write_str(address),
        }
    }
}

/// One DNS record. `V` is [`RecordValue`] while planned and `String` once
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecordRequest<V = RecordValue> {
    pub domain: String,
    pub sub_domain: String,
    pub record_type: RecordType,
    pub record_line: String,
    pub ttl: Option<u32>,
    pub mx: Option<u32>,
    pub status: RecordStatus,
    pub value: V,
}

/// All records for one custom domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPlan<V = RecordValue> {
    pub domain: String,
    pub records: Vec<DomainRecordRequest<V>>,
}

pub type ResolvedDomainPlan = DomainPlan<String>;

impl DomainPlan {
    /// Regions this plan still waits on.
    pub fn pending_regions(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|r| match &r.value {
            RecordValue::Pending(region) => Some(region.as_str()),
            RecordValue::Resolved(_) => None,
        })
    }
}

/// Plan one pending record per (checked domain, region with a record line).
pub fn build_placeholder_records(
    domains: &[CheckedDomain],
    regions: &[RegionConfig],
) -> Vec<DomainPlan> {
    domains
        .iter()
        .map(|checked| {
            let sub_domain = checked
                .sub_domain
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(ROOT_SUBDOMAIN);
            let records = regions
                .iter()
                .filter_map(|rc| {
                    let line = rc.dns.record_line.as_ref()?;
                    Some(DomainRecordRequest {
                        domain: checked.domain.clone(),
                        sub_domain: sub_domain.to_string(),
                        record_type: rc.dns.record_type,
                        record_line: line.clone(),
                        ttl: rc.dns.ttl,
                        mx: rc.dns.mx,
                        status: rc.dns.status,
                        value: RecordValue::Pending(rc.region.clone()),
                    })
                })
                .collect();
            DomainPlan {
                domain: checked.domain.clone(),
                records,
            }
        })
        .collect()
}

/// Substitute every pending value with its region's address.
pub fn resolve_placeholders(
    plans: &[DomainPlan],
    addresses: &HashMap<String, String>,
) -> Result<Vec<ResolvedDomainPlan>, UnresolvedPlaceholder> {
    let mut resolved = Vec::with_capacity(plans.len());
    for plan in plans {
        let records = plan
            .records
            .iter()
            .map(|record| resolve_record(record, addresses))
            .collect::<Result<Vec<_>, _>>()?;
        resolved.push(DomainPlan {
            domain: plan.domain.clone(),
            records,
        });
    }
    Ok(resolved)
}

fn resolve_record(
    record: &DomainRecordRequest,
    addresses: &HashMap<String, String>,
) -> Result<DomainRecordRequest<String>, UnresolvedPlaceholder> {
    let value = match &record.value {
        RecordValue::Resolved(address) => address.clone(),
        RecordValue::Pending(region) => {
            addresses
                .get(region)
                .cloned()
                .ok_or_else(|| UnresolvedPlaceholder {
                    domain: record.domain.clone(),
                    region: region.clone(),
                })?
        }
    };
    Ok(DomainRecordRequest {
        domain: record.domain.clone(),
        sub_domain: record.sub_domain.clone(),
        record_type: record.record_type,
        record_line: record.record_line.clone(),
        ttl: record.ttl,
        mx: record.mx,
        status: record.status,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputDocument;
    use crate::normalize::{NormalizeContext, normalize};
    use crate::region::resolve_regions;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn two_regions_one_line() -> Vec<RegionConfig> {
        let doc = InputDocument::from_value(json!({
            "project_name": "demo",
            "region": ["ap-guangzhou", "ap-shanghai"],
            "gateway": {"custom_domains": [{"domain": "example.com"}]},
            "regions": {"ap-shanghai": {"dns": {"record_line": "电信", "ttl": 600}}}
        }))
        .unwrap();
        let cfg = normalize(&doc, &NormalizeContext::new("/app"), &mut StdRng::seed_from_u64(0))
            .unwrap();
        resolve_regions(&cfg).unwrap()
    }

    fn checked(domain: &str, sub: Option<&str>) -> CheckedDomain {
        CheckedDomain {
            domain: domain.to_string(),
            sub_domain: sub.map(str::to_string),
        }
    }

    #[test]
    fn one_record_per_domain_and_lined_region() {
        let regions = two_regions_one_line();
        let plans = build_placeholder_records(&[checked("example.com", None)], &regions);

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.domain, "example.com");
        assert_eq!(plan.records.len(), 1);

        let record = &plan.records[0];
        assert_eq!(record.sub_domain, "@");
        assert_eq!(record.record_type, RecordType::Cname);
        assert_eq!(record.record_line, "电信");
        assert_eq!(record.ttl, Some(600));
        assert_eq!(record.status, RecordStatus::Enable);
        assert_eq!(record.value, RecordValue::Pending("ap-shanghai".to_string()));
        assert_eq!(record.value.to_string(), "pending:ap-shanghai");
        assert_eq!(plan.pending_regions().collect::<Vec<_>>(), vec!["ap-shanghai"]);
    }

    #[test]
    fn checked_subdomain_is_used() {
        let regions = two_regions_one_line();
        let plans = build_placeholder_records(&[checked("example.com", Some("www"))], &regions);
        assert_eq!(plans[0].records[0].sub_domain, "www");
    }

    #[test]
    fn no_lines_no_records() {
        let mut regions = two_regions_one_line();
        for rc in &mut regions {
            rc.dns.record_line = None;
        }
        let plans = build_placeholder_records(&[checked("example.com", None)], &regions);
        assert_eq!(plans.len(), 1);
        assert!(plans[0].records.is_empty());
    }

    #[test]
    fn resolve_substitutes_addresses() {
        let regions = two_regions_one_line();
        let plans = build_placeholder_records(&[checked("example.com", None)], &regions);
        let addresses = HashMap::from([
            ("ap-guangzhou".to_string(), "service-gz.gz.apigw.example".to_string()),
            ("ap-shanghai".to_string(), "service-sh.sh.apigw.example".to_string()),
        ]);

        let resolved = resolve_placeholders(&plans, &addresses).unwrap();
        assert_eq!(resolved[0].records[0].value, "service-sh.sh.apigw.example");
        assert_eq!(resolved[0].records[0].record_line, "电信");
    }

    #[test]
    fn resolve_fails_on_missing_region() {
        let regions = two_regions_one_line();
        let plans = build_placeholder_records(&[checked("example.com", None)], &regions);
        let addresses = HashMap::from([(
            "ap-guangzhou".to_string(),
            "service-gz.gz.apigw.example".to_string(),
        )]);

        let err = resolve_placeholders(&plans, &addresses).unwrap_err();
        assert_eq!(
            err,
            UnresolvedPlaceholder {
                domain: "example.com".to_string(),
                region: "ap-shanghai".to_string(),
            }
        );
    }

    #[test]
    fn already_resolved_values_pass_through() {
        let plan = DomainPlan {
            domain: "example.com".to_string(),
            records: vec![DomainRecordRequest {
                domain: "example.com".to_string(),
                sub_domain: "@".to_string(),
                record_type: RecordType::Cname,
                record_line: "默认".to_string(),
                ttl: None,
                mx: None,
                status: RecordStatus::Enable,
                value: RecordValue::Resolved("fixed.example".to_string()),
            }],
        };
        let resolved = resolve_placeholders(&[plan], &HashMap::new()).unwrap();
        assert_eq!(resolved[0].records[0].value, "fixed.example");
    }
}
