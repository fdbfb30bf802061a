use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::DiscoveryError;
use crate::fetch::{decode, Fetch};
use crate::ident::{self, ReportId};
use crate::model::ReportHint;

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

const FILER_LINK: &str = "reports.asp?intLobbyistID=";
const PERIOD_LINK: &str = "reports.asp?intYear=";

pub fn reports_home_url(base_url: &str) -> String {
    format!("{}/lobbyists/reports.asp", base_url.trim_end_matches('/'))
}

/// Per-period index page. The portal expects the month without a leading zero.
pub fn period_url(base_url: &str, year: i32, month: u32) -> String {
    format!("{}?intYear={}&intMonth={}", reports_home_url(base_url), year, month)
}

/// Index links found on the reports home page. Every tab is rendered into the
/// page source, so one fetch yields all of them.
#[derive(Debug, Default)]
pub struct IndexLinks {
    /// Per-lobbyist listings; only useful for filer bookkeeping.
    pub filer: Vec<String>,
    /// Per-month listings; these feed discovery.
    pub period: Vec<String>,
}

pub fn index_links(home_markup: &str, base_url: &str) -> IndexLinks {
    let mut links = IndexLinks::default();
    let home = match Url::parse(&reports_home_url(base_url)) {
        Ok(u) => u,
        Err(e) => {
            warn!(base_url, error = %e, "base URL does not parse; no links resolved");
            return links;
        }
    };
    let document = Html::parse_document(home_markup);
    let mut seen = HashSet::new();

    for a in document.select(&LINK_SEL) {
        let Some(href) = a.value().attr("href") else { continue };
        let href = href.trim();
        let bucket = if href.contains(FILER_LINK) {
            &mut links.filer
        } else if href.contains(PERIOD_LINK) {
            &mut links.period
        } else {
            continue;
        };
        // Hrefs are relative to the home page itself.
        let url = match home.join(href) {
            Ok(u) => u.to_string(),
            Err(e) => {
                debug!(href, error = %e, "unresolvable index link");
                continue;
            }
        };
        if seen.insert(url.clone()) {
            bucket.push(url);
        }
    }
    links
}

/// Fetch the reports home page and classify its links.
pub fn fetch_index_links(fetch: &impl Fetch, base_url: &str) -> Result<IndexLinks, DiscoveryError> {
    let url = reports_home_url(base_url);
    info!("Fetching reports home: {}", url);
    let markup = decode(&fetch.fetch(&url)?);
    let links = index_links(&markup, base_url);
    if links.period.is_empty() {
        return Err(DiscoveryError::NoIndexLinks { url });
    }
    info!(
        period = links.period.len(),
        filer = links.filer.len(),
        "Index links found"
    );
    Ok(links)
}

/// Canonical identifiers occurring anywhere in the markup, braced or not.
pub fn scan_ids(markup: &str) -> HashSet<ReportId> {
    ident::find_all(markup).collect()
}

/// Report-kind hints from index rows. Only innermost rows count, so layout
/// tables wrapping the listing don't smear one row's kind over the others.
/// Within a row only the report-kind cell is read; party names such as
/// "Annual Giving Council" never produce a hint.
pub fn scan_hints(markup: &str) -> HashMap<ReportId, ReportHint> {
    let document = Html::parse_document(markup);
    let mut hints = HashMap::new();

    for row in document.select(&ROW_SEL) {
        if row.select(&ROW_SEL).next().is_some() {
            continue;
        }
        let Some(hint) = row
            .select(&CELL_SEL)
            .find_map(|cell| kind_hint(&cell.text().collect::<String>()))
        else {
            continue;
        };
        for id in ident::find_all(&row.html()) {
            hints.entry(id).or_insert(hint);
        }
    }
    hints
}

/// `Quarterly Report`, `Annual Report of Expenditures`, …
fn kind_hint(cell_text: &str) -> Option<ReportHint> {
    let text = cell_text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let (hint, rest) = if let Some(rest) = text.strip_prefix("quarterly ") {
        (ReportHint::Quarterly, rest)
    } else if let Some(rest) = text.strip_prefix("annual ") {
        (ReportHint::Annual, rest)
    } else {
        return None;
    };
    rest.starts_with("report").then_some(hint)
}

#[derive(Debug, Default)]
pub struct Discovered {
    pub ids: HashSet<ReportId>,
    pub hints: HashMap<ReportId, ReportHint>,
}

/// Union of identifiers across all index pages. A page without matches is an
/// empty period, not an error; a page that can't be fetched is.
pub fn discover(fetch: &impl Fetch, urls: &[String]) -> Result<Discovered, DiscoveryError> {
    let mut out = Discovered::default();

    for url in urls {
        let markup = decode(&fetch.fetch(url)?);
        let ids = scan_ids(&markup);
        debug!(url = url.as_str(), found = ids.len(), "index page scanned");
        for (id, hint) in scan_hints(&markup) {
            out.hints.entry(id).or_insert(hint);
        }
        out.ids.extend(ids);
    }

    info!(pages = urls.len(), reports = out.ids.len(), "Discovery complete");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;

    const BASE: &str = "http://www2.seattle.gov/ethics";
    const A: &str = "11111111-AAAA-BBBB-CCCC-000000000001";
    const B: &str = "22222222-AAAA-BBBB-CCCC-000000000002";
    const C: &str = "33333333-aaaa-bbbb-cccc-000000000003";

    fn id(s: &str) -> ReportId {
        ReportId::parse(s).unwrap()
    }

    #[test]
    fn scan_dedups_braced_and_bare() {
        let html = format!(
            r#"<a href="popfiling.asp?prguid={{{a}}}">PopUp</a>
               <a href="popfiling.asp?prguid={{{a}}}">PopUp</a>
               <input value="{a}"> {b} {{{b}}}"#,
            a = A,
            b = B
        );
        let ids = scan_ids(&html);
        assert_eq!(ids, HashSet::from([id(A), id(B)]));
    }

    #[test]
    fn empty_page_is_valid() {
        assert!(scan_ids("<html><body>No reports this month</body></html>").is_empty());
    }

    #[test]
    fn discover_unions_pages() {
        let p1 = period_url(BASE, 2012, 8);
        let p2 = period_url(BASE, 2012, 9);
        let p3 = period_url(BASE, 2012, 10);
        let fetcher = MockFetcher::default()
            .with(p1.clone(), format!("{{{}}} {{{}}} {}", A, A, B))
            .with(p2.clone(), format!("{} {{{}}}", B, C))
            .with(p3.clone(), "<table></table>");
        let found = discover(&fetcher, &[p1, p2, p3]).unwrap();
        assert_eq!(found.ids, HashSet::from([id(A), id(B), id(C)]));
        assert!(found.ids.iter().all(|i| !i.as_str().contains('{')));
    }

    #[test]
    fn discover_surfaces_fetch_failure() {
        let ok = period_url(BASE, 2012, 8);
        let missing = period_url(BASE, 2012, 9);
        let fetcher = MockFetcher::default().with(ok.clone(), A);
        let err = discover(&fetcher, &[ok, missing.clone()]).unwrap_err();
        match err {
            DiscoveryError::Fetch(e) => assert_eq!(e.url, missing),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hints_come_from_innermost_rows() {
        let html = format!(
            r#"<table><tr><td><table>
                 <tr><td>Quarterly Report of Expenditures</td><td><a href="x?prguid={{{a}}}">PopUp</a></td></tr>
                 <tr><td>Annual Report of Expenditures</td><td><a href="x?prguid={{{b}}}">PopUp</a></td></tr>
                 <tr><td>Registration</td><td><a href="x?prguid={{{c}}}">PopUp</a></td></tr>
               </table></td></tr></table>"#,
            a = A,
            b = B,
            c = C
        );
        let hints = scan_hints(&html);
        assert_eq!(hints.get(&id(A)), Some(&ReportHint::Quarterly));
        assert_eq!(hints.get(&id(B)), Some(&ReportHint::Annual));
        assert_eq!(hints.get(&id(C)), None);
    }

    #[test]
    fn classifies_home_links() {
        let html = r#"
            <a href="reports.asp?intLobbyistID=12">Jane Doe</a>
            <a href="reports.asp?intYear=2012&intMonth=8">August</a>
            <a href="reports.asp?intYear=2012&intMonth=8">August</a>
            <a href="/ethics/lobbyists/lobbyhome.asp">Home</a>
            <a href="http://www2.seattle.gov/ethics/lobbyists/reports.asp?intYear=2013&intMonth=1">January</a>"#;
        let links = index_links(html, BASE);
        assert_eq!(links.filer, vec![format!("{}/lobbyists/reports.asp?intLobbyistID=12", BASE)]);
        assert_eq!(
            links.period,
            vec![
                format!("{}/lobbyists/reports.asp?intYear=2012&intMonth=8", BASE),
                format!("{}/lobbyists/reports.asp?intYear=2013&intMonth=1", BASE),
            ]
        );
    }

    #[test]
    fn resolves_root_relative_and_parent_hrefs() {
        let html = r#"
            <a href="/ethics/lobbyists/reports.asp?intYear=2012&amp;intMonth=8">August</a>
            <a href="../lobbyists/reports.asp?intYear=2012&amp;intMonth=9">September</a>
            <a href="./reports.asp?intLobbyistID=7">John Roe</a>"#;
        let links = index_links(html, BASE);
        assert_eq!(
            links.period,
            vec![
                format!("{}/lobbyists/reports.asp?intYear=2012&intMonth=8", BASE),
                format!("{}/lobbyists/reports.asp?intYear=2012&intMonth=9", BASE),
            ]
        );
        assert_eq!(links.filer, vec![format!("{}/lobbyists/reports.asp?intLobbyistID=7", BASE)]);
    }

    #[test]
    fn party_names_do_not_hint() {
        let html = format!(
            r#"<table>
                 <tr><td>Annual Giving Council</td><td>Lobbyist Report of Expenditures</td>
                     <td><a href="x?prguid={{{a}}}">PopUp</a></td></tr>
                 <tr><td>Quarterly Fund LLC</td><td>Annual Report of Expenditures</td>
                     <td><a href="x?prguid={{{b}}}">PopUp</a></td></tr>
               </table>"#,
            a = A,
            b = B
        );
        let hints = scan_hints(&html);
        assert_eq!(hints.get(&id(A)), None);
        assert_eq!(hints.get(&id(B)), Some(&ReportHint::Annual));
    }

    #[test]
    fn home_without_period_links_fails() {
        let fetcher = MockFetcher::default().with(reports_home_url(BASE), "<p>maintenance</p>");
        assert!(matches!(
            fetch_index_links(&fetcher, BASE),
            Err(DiscoveryError::NoIndexLinks { .. })
        ));
    }

    #[test]
    fn period_url_has_no_leading_zero() {
        assert_eq!(
            period_url(BASE, 2013, 2),
            "http://www2.seattle.gov/ethics/lobbyists/reports.asp?intYear=2013&intMonth=2"
        );
    }
}
