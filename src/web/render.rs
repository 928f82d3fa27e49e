// src/web/render.rs
use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::analyze::{ChartSummary, CorpusAnalysis};
use crate::web::icon::sanitize_icon_url;

const DAY: &str = "%Y-%m-%d";

const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,Ubuntu,sans-serif;background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);min-height:100vh;padding:20px}
.container{max-width:1400px;margin:0 auto}
.panel{background:#fff;border-radius:10px;padding:24px;margin-bottom:20px;box-shadow:0 4px 6px rgba(0,0,0,.1)}
h1{color:#2d3748;margin-bottom:8px}
h2{color:#2d3748;margin-bottom:20px}
.subtitle{color:#718096;font-size:14px}
.stats{display:grid;grid-template-columns:repeat(auto-fit,minmax(250px,1fr));gap:20px;margin-bottom:20px}
.stat-card{background:#fff;border-radius:10px;padding:20px;box-shadow:0 4px 6px rgba(0,0,0,.1)}
.stat-value{font-size:36px;font-weight:700;color:#667eea;margin-bottom:5px}
.stat-label{color:#718096;font-size:14px;text-transform:uppercase;letter-spacing:1px}
.filters{display:flex;gap:15px;flex-wrap:wrap;align-items:center}
.filter-group{flex:1;min-width:250px}
.filter-label{display:block;font-size:12px;font-weight:600;color:#4a5568;margin-bottom:5px;text-transform:uppercase}
.filter-input{width:100%;padding:10px 15px;border:2px solid #e2e8f0;border-radius:8px;font-size:14px}
.filter-input:focus{outline:none;border-color:#667eea}
.filter-stats{color:#718096;font-size:14px}
.charts-grid{display:grid;gap:15px}
.chart-item{border:1px solid #e2e8f0;border-radius:8px;padding:20px}
.chart-item.hidden{display:none}
.chart-title{display:flex;align-items:center;margin-bottom:10px}
.chart-icon{width:40px;height:40px;margin-right:15px;border-radius:5px}
.chart-name{font-size:20px;font-weight:600;color:#2d3748}
.chart-repo{font-size:12px;color:#667eea;font-weight:600;margin-top:2px}
.chart-description{color:#718096;font-size:14px;margin-bottom:10px}
.chart-meta{display:flex;flex-wrap:wrap;gap:15px;font-size:13px;color:#4a5568}
.meta-label{font-weight:600;margin-right:5px}
.badge{background:#667eea;color:#fff;padding:4px 12px;border-radius:12px;font-size:12px;font-weight:600;cursor:pointer;border:none}
.badge:hover{background:#5568d3}
.expand-icon{margin-left:5px;font-size:10px;display:inline-block;transition:transform .2s}
.expanded .expand-icon{transform:rotate(180deg)}
.versions-list{max-height:0;overflow:hidden;transition:max-height .3s ease-out;margin-top:10px}
.versions-list.expanded{max-height:500px;overflow-y:auto}
.version-item{padding:8px 12px;border-left:3px solid #667eea;background:#f7fafc;margin-bottom:5px;border-radius:4px;display:flex;justify-content:space-between;align-items:center}
.version-number{font-weight:600;color:#2d3748;font-family:"Courier New",monospace}
.version-date{color:#718096;font-size:12px}
.version-link{color:#667eea;text-decoration:none;font-size:12px;font-weight:600;padding:4px 8px;border-radius:4px}
.version-link:hover{background:#667eea;color:#fff}
.no-results{text-align:center;padding:40px;color:#718096;display:none}
"#;

const PAGE_JS: &str = r#"
(function(){
  const repoFilter = document.getElementById('repoFilter');
  const chartFilter = document.getElementById('chartFilter');
  const grid = document.getElementById('chartsGrid');
  const noResults = document.getElementById('noResults');
  const visibleCount = document.getElementById('visibleCount');
  const items = document.querySelectorAll('.chart-item');

  const repos = new Set();
  items.forEach(i => { if (i.dataset.repository) repos.add(i.dataset.repository); });
  Array.from(repos).sort().forEach(r => {
    const o = document.createElement('option');
    o.value = r;
    o.textContent = r;
    repoFilter.appendChild(o);
  });

  function applyFilters(){
    const repo = repoFilter.value;
    const q = chartFilter.value.toLowerCase();
    let visible = 0;
    items.forEach(i => {
      const ok = (!repo || i.dataset.repository === repo) &&
                 (!q || i.dataset.chartName.toLowerCase().includes(q));
      i.classList.toggle('hidden', !ok);
      if (ok) visible++;
    });
    visibleCount.textContent = visible;
    grid.style.display = visible ? 'grid' : 'none';
    noResults.style.display = visible ? 'none' : 'block';
  }

  document.querySelectorAll('.badge').forEach(b => b.addEventListener('click', () => {
    b.classList.toggle('expanded');
    b.closest('.chart-item').querySelector('.versions-list').classList.toggle('expanded');
  }));

  repoFilter.addEventListener('change', applyFilters);
  chartFilter.addEventListener('input', applyFilters);

  document.addEventListener('keydown', e => {
    if (e.key === '/' && document.activeElement !== chartFilter) {
      e.preventDefault();
      chartFilter.focus();
    }
    if (e.key === 'Escape' && document.activeElement === chartFilter) {
      chartFilter.value = '';
      applyFilters();
      chartFilter.blur();
    }
  });
})();
"#;

/// Full dashboard page for a merged view.
pub fn dashboard(analysis: &CorpusAnalysis, generated: DateTime<Utc>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Helm Repository Dashboard" }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                div.container {
                    div.panel {
                        h1 { "Helm Repository Dashboard" }
                        p.subtitle { "Generated: " (generated.format("%Y-%m-%d %H:%M:%S UTC").to_string()) }
                    }
                    (stats(analysis))
                    div.panel.filters {
                        div.filter-group {
                            label.filter-label for="repoFilter" { "Filter by repository" }
                            select.filter-input id="repoFilter" {
                                option value="" { "All repositories" }
                            }
                        }
                        div.filter-group {
                            label.filter-label for="chartFilter" { "Filter by chart name" }
                            input.filter-input id="chartFilter" type="text" placeholder="Type to filter charts... (press /)";
                        }
                        div.filter-stats {
                            "Showing " span id="visibleCount" { (analysis.charts.len()) }
                            " of " (analysis.charts.len()) " charts"
                        }
                    }
                    div.panel {
                        h2 { "Available charts" }
                        div.charts-grid id="chartsGrid" {
                            @for chart in &analysis.charts {
                                (chart_card(chart))
                            }
                        }
                        div.no-results id="noResults" { "No charts match your filter criteria" }
                    }
                }
                script { (PreEscaped(PAGE_JS)) }
            }
        }
    }
}

fn stats(analysis: &CorpusAnalysis) -> Markup {
    html! {
        div.stats {
            div.stat-card {
                div.stat-value { (analysis.total_charts) }
                div.stat-label { "Total charts" }
            }
            div.stat-card {
                div.stat-value { (analysis.total_versions) }
                div.stat-label { "Total versions" }
            }
            @if let Some(d) = &analysis.dates {
                div.stat-card {
                    div.stat-value { (d.oldest.format(DAY).to_string()) }
                    div.stat-label { "Oldest chart" }
                }
                div.stat-card {
                    div.stat-value { (d.newest.format(DAY).to_string()) }
                    div.stat-label { "Newest chart" }
                }
            }
        }
    }
}

fn chart_card(chart: &ChartSummary) -> Markup {
    let repo = chart.source.as_deref().unwrap_or_default();
    html! {
        div.chart-item data-chart-name=(chart.name) data-repository=(repo) {
            div.chart-title {
                @if let Some(icon) = sanitize_icon_url(&chart.icon) {
                    img.chart-icon src=(icon) alt=(chart.name) loading="lazy";
                }
                div {
                    div.chart-name { (chart.name) }
                    @if !repo.is_empty() {
                        div.chart-repo { (repo) }
                    }
                }
            }
            @if !chart.description.is_empty() {
                div.chart-description { (chart.description) }
            }
            div.chart-meta {
                button.badge type="button" {
                    (chart.version_count) " versions"
                    span.expand-icon { "▼" }
                }
                @if let Some(d) = &chart.dates {
                    span { span.meta-label { "Oldest:" } (d.oldest.format(DAY).to_string()) }
                    span { span.meta-label { "Newest:" } (d.newest.format(DAY).to_string()) }
                }
            }
            div.versions-list {
                @for v in &chart.version_details {
                    div.version-item {
                        div {
                            span.version-number { (v.version) }
                            @if let Some(created) = v.created {
                                span.version-date { " · " (created.format(DAY).to_string()) }
                            }
                        }
                        @if let Some(url) = v.url.as_deref().filter(|u| is_web_link(u)) {
                            a.version-link href=(url) target="_blank" rel="noopener noreferrer" { "Download" }
                        }
                    }
                }
            }
        }
    }
}

/// Download links are rendered only for absolute http(s) URLs.
fn is_web_link(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{DateStats, VersionDetail};
    use chrono::TimeZone;

    fn chart(icon: &str) -> ChartSummary {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        ChartSummary {
            name: "nginx".into(),
            version_count: 1,
            versions: vec!["1.0.0".into()],
            version_details: vec![VersionDetail {
                version: "1.0.0".into(),
                created: Some(t),
                url: Some("javascript:alert(1)".into()),
            }],
            dates: Some(DateStats {
                oldest: t,
                newest: t,
                median: t,
            }),
            icon: icon.into(),
            description: "<b>web</b> server".into(),
            source: Some("bitnami".into()),
        }
    }

    fn page(c: ChartSummary) -> String {
        let analysis = CorpusAnalysis {
            total_charts: 1,
            total_versions: 1,
            dates: c.dates,
            charts: vec![c],
        };
        dashboard(&analysis, Utc::now()).into_string()
    }

    #[test]
    fn renders_chart_fields_escaped() {
        let out = page(chart("https://example.com/nginx.svg"));
        assert!(out.contains(r#"data-chart-name="nginx""#));
        assert!(out.contains(r#"data-repository="bitnami""#));
        assert!(out.contains(r#"src="https://example.com/nginx.svg""#));
        assert!(out.contains("&lt;b&gt;web&lt;/b&gt; server"));
        assert!(out.contains("2024-03-01"));
        assert!(!out.contains("javascript:"));
    }

    #[test]
    fn unsafe_icon_is_dropped() {
        let out = page(chart("javascript:alert('XSS')"));
        assert!(!out.contains("chart-icon\" src"));
        assert!(!out.contains("alert('XSS')"));
    }
}
