use std::collections::{HashSet, VecDeque};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::db::Repository;
use crate::error::StoreError;
use crate::ident::ReportId;
use crate::model::Report;

/// Where a report sits relative to the amendment it was filed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lineage {
    Standalone,
    Original { amended_by: ReportId },
    Amendment { of: ReportId },
}

impl Lineage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lineage::Standalone => "standalone",
            Lineage::Original { .. } => "original",
            Lineage::Amendment { .. } => "amendment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AmendmentLink {
    pub original: ReportId,
    pub amendment: ReportId,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub report: Report,
    pub lineage: Lineage,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub resolved: Vec<Resolved>,
    pub links: Vec<AmendmentLink>,
}

/// One-hop lineage from the refs captured in the report's own history block.
/// Odd dates are logged, never fatal: the filing is stored as printed.
pub fn lineage_of(report: &Report) -> Lineage {
    let Some(h) = &report.history else {
        return Lineage::Standalone;
    };
    if h.amendment.filed_at < h.original.filed_at {
        warn!(
            id = %report.id,
            original = %h.original.id,
            amendment = %h.amendment.id,
            "amendment dated before its original"
        );
    }
    if h.original.id == report.id {
        Lineage::Original {
            amended_by: h.amendment.id.clone(),
        }
    } else {
        if h.amendment.id != report.id {
            // A later amendment in a longer chain; it still amends the original.
            debug!(id = %report.id, listed = %h.amendment.id, "history lists a different amendment");
        }
        Lineage::Amendment {
            of: h.original.id.clone(),
        }
    }
}

pub fn resolve(batch: Vec<Report>) -> Resolution {
    let mut out = Resolution::default();
    let mut seen = HashSet::new();

    for report in batch {
        let lineage = lineage_of(&report);
        let link = match &lineage {
            Lineage::Standalone => None,
            Lineage::Original { amended_by } => Some(AmendmentLink {
                original: report.id.clone(),
                amendment: amended_by.clone(),
            }),
            Lineage::Amendment { of } => Some(AmendmentLink {
                original: of.clone(),
                amendment: report.id.clone(),
            }),
        };
        if let Some(link) = link.filter(|l| seen.insert(l.clone())) {
            out.links.push(link);
        }
        out.resolved.push(Resolved { report, lineage });
    }
    out
}

/// Every stored filing connected to one report, root first, then by
/// filing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendmentChain {
    pub ids: Vec<ReportId>,
}

impl AmendmentChain {
    pub fn root(&self) -> &ReportId {
        &self.ids[0]
    }

    pub fn latest(&self) -> &ReportId {
        &self.ids[self.ids.len() - 1]
    }
}

/// Walks back through `original_ref` to the root, then forward through every
/// stored amendment. Ids already visited are not revisited, so a cyclic
/// history terminates.
pub fn amendment_chain(repo: &impl Repository, id: &ReportId) -> Result<AmendmentChain, StoreError> {
    let mut root = id.clone();
    let mut back = HashSet::from([root.clone()]);
    while let Some(summary) = repo.summary(&root)? {
        match summary.original_ref {
            Some(prev) if back.insert(prev.clone()) => root = prev,
            _ => break,
        }
    }

    let mut members: Vec<(Option<NaiveDateTime>, ReportId)> = Vec::new();
    let mut visited = HashSet::from([root.clone()]);
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(current) = queue.pop_front() {
        let summary = repo.summary(&current)?;
        let mut next: Vec<ReportId> = repo
            .amendments_of(&current)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        if let Some(s) = &summary {
            next.extend(s.amendment_ref.iter().cloned());
        }
        members.push((summary.map(|s| s.filed_at), current));
        for n in next {
            if visited.insert(n.clone()) {
                queue.push_back(n);
            }
        }
    }

    // Unstored filings (known only by reference) sort after stored ones.
    let (head, rest) = members.split_at_mut(1);
    rest.sort_by(|(ta, ia), (tb, ib)| match (ta, tb) {
        (Some(a), Some(b)) => a.cmp(b).then_with(|| ia.cmp(ib)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => ia.cmp(ib),
    });
    let ids = head.iter().chain(rest.iter()).map(|(_, i)| i.clone()).collect();
    Ok(AmendmentChain { ids })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::SqliteRepository;
    use crate::model::{FilingRef, ReportHistory, ReportType, TypeSpecificFields};
    use crate::normalize::normalize;

    const BASE: &str = "http://www2.seattle.gov/ethics";

    fn id(n: u32) -> ReportId {
        ReportId::parse(&format!("{:08X}-AAAA-4000-8000-000000000000", n)).unwrap()
    }

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, 3, day).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn report(n: u32, day: u32, history: Option<((u32, u32), (u32, u32))>) -> Report {
        let rid = id(n);
        Report {
            permalink: rid.permalink(BASE),
            id: rid,
            report_type: ReportType::AnnualExpenseReport,
            filed_at: at(day),
            history: history.map(|((o, od), (a, ad))| ReportHistory {
                original: FilingRef { id: id(o), filed_at: at(od) },
                amendment: FilingRef { id: id(a), filed_at: at(ad) },
            }),
            fields: TypeSpecificFields::AnnualExpenses {
                lobbyist: "Jane Q. Doe".into(),
                year: 2010,
                clients: vec![],
            },
        }
    }

    #[test]
    fn standalone_original_and_amendment() {
        let r = resolve(vec![
            report(1, 1, None),
            report(2, 2, Some(((2, 2), (3, 5)))),
            report(3, 5, Some(((2, 2), (3, 5)))),
        ]);
        let lineages: Vec<_> = r.resolved.iter().map(|x| x.lineage.clone()).collect();
        assert_eq!(
            lineages,
            vec![
                Lineage::Standalone,
                Lineage::Original { amended_by: id(3) },
                Lineage::Amendment { of: id(2) },
            ]
        );
        // Both sides name the same link; it is reported once.
        assert_eq!(
            r.links,
            vec![AmendmentLink {
                original: id(2),
                amendment: id(3)
            }]
        );
    }

    #[test]
    fn amendment_without_original_in_batch() {
        let r = resolve(vec![report(3, 5, Some(((2, 2), (3, 5))))]);
        assert_eq!(r.resolved[0].lineage, Lineage::Amendment { of: id(2) });
        assert_eq!(r.links.len(), 1);
    }

    #[test]
    fn backdated_amendment_is_kept() {
        let r = resolve(vec![report(1, 1, None), report(3, 1, Some(((2, 9), (3, 1))))]);
        assert_eq!(r.resolved.len(), 2);
        assert_eq!(r.resolved[1].lineage, Lineage::Amendment { of: id(2) });
    }

    fn store(repo: &SqliteRepository, reports: Vec<Report>) {
        for resolved in resolve(reports).resolved {
            let record = normalize(&resolved).unwrap();
            repo.upsert(&resolved.report.id, &record).unwrap();
        }
    }

    #[test]
    fn chain_over_multiple_hops() {
        let repo = SqliteRepository::in_memory().unwrap();
        // 1 is amended by 2; a later filing 3 amends 1 again.
        store(
            &repo,
            vec![
                report(3, 20, Some(((1, 1), (3, 20)))),
                report(1, 1, Some(((1, 1), (2, 10)))),
                report(2, 10, Some(((1, 1), (2, 10)))),
            ],
        );
        for start in [id(1), id(2), id(3)] {
            let chain = amendment_chain(&repo, &start).unwrap();
            assert_eq!(chain.ids, vec![id(1), id(2), id(3)]);
            assert_eq!(chain.root(), &id(1));
            assert_eq!(chain.latest(), &id(3));
        }
    }

    #[test]
    fn chain_for_unamended_report() {
        let repo = SqliteRepository::in_memory().unwrap();
        store(&repo, vec![report(7, 1, None)]);
        assert_eq!(amendment_chain(&repo, &id(7)).unwrap().ids, vec![id(7)]);
    }

    #[test]
    fn chain_with_unstored_original() {
        let repo = SqliteRepository::in_memory().unwrap();
        store(&repo, vec![report(3, 5, Some(((2, 2), (3, 5))))]);
        assert_eq!(amendment_chain(&repo, &id(3)).unwrap().ids, vec![id(2), id(3)]);
    }

    #[test]
    fn chain_survives_cycles() {
        let repo = SqliteRepository::in_memory().unwrap();
        // Corrupt data: each report claims the other as its original.
        store(
            &repo,
            vec![
                report(1, 3, Some(((2, 2), (1, 3)))),
                report(2, 4, Some(((1, 3), (2, 4)))),
            ],
        );
        let chain = amendment_chain(&repo, &id(1)).unwrap();
        assert_eq!(chain.ids.len(), 2);
        assert!(chain.ids.contains(&id(1)) && chain.ids.contains(&id(2)));
    }
}
