use chrono::{Duration, Local, NaiveDate};
use std::fs;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const PROFILE_PATH: &str = "/api/public/fund_etf_profile_em";
    pub const HISTORY_PATH: &str = "/api/public/fund_etf_hist_em";

    /// Daily rows ending today, each close `factor` times the previous one.
    pub fn history_body(days: usize, factor: f64) -> String {
        let today = Local::now().date_naive();
        let rows: Vec<serde_json::Value> = (0..days)
            .map(|i| {
                let date: NaiveDate = today - Duration::days((days - 1 - i) as i64);
                serde_json::json!({
                    "日期": date.format("%Y-%m-%d").to_string(),
                    "开盘": 1.0,
                    "收盘": factor.powi(i as i32),
                    "成交量": 10000
                })
            })
            .collect();
        serde_json::to_string(&rows).unwrap()
    }

    pub async fn mount_profile(server: &MockServer, code: &str, yield_value: &str) {
        let body = format!(r#"[{{"item": "股息率", "value": "{yield_value}"}}]"#);
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .and(query_param("symbol", code))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_history(server: &MockServer, code: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(HISTORY_PATH))
            .and(query_param("symbol", code))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    pub fn write_config(
        dir: &std::path::Path,
        base_url: &str,
        notifier: Option<(&str, &str)>,
    ) -> std::path::PathBuf {
        let notifier_section = match notifier {
            Some((url, env)) => format!(
                "notifier:\n  enabled: true\n  base_url: \"{url}\"\n  sendkey_env: \"{env}\"\n"
            ),
            None => String::new(),
        };
        let content = format!(
            r#"
instruments:
  - code: "510720"
    name: "上证红利ETF"
    default_yield: 4.5
  - code: "515180"
    name: "中证红利ETF"
    default_yield: 4.2
  - code: "512890"
    name: "红利低波ETF"
    default_yield: 4.0
strategy:
  request_delay_secs: 0
providers:
  aktools:
    base_url: "{base_url}"
    request_timeout_secs: 5
cache_path: "{cache}"
{notifier_section}"#,
            cache = dir.join("dividend_cache.json").display(),
        );
        let config_path = dir.join("config.yaml");
        fs::write(&config_path, content).expect("Failed to write config file");
        config_path
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    use divrot::{AppCommand, RunOptions, RunOutcome};

    let server = wiremock::MockServer::start().await;
    test_utils::mount_profile(&server, "510720", "5.10%").await;
    test_utils::mount_profile(&server, "515180", "99%").await;
    test_utils::mount_profile(&server, "512890", "4.80%").await;
    test_utils::mount_history(&server, "510720", 200, test_utils::history_body(120, 1.01)).await;
    test_utils::mount_history(&server, "515180", 200, test_utils::history_body(120, 1.0)).await;
    test_utils::mount_history(&server, "512890", 200, test_utils::history_body(120, 0.99)).await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = test_utils::write_config(dir.path(), &server.uri(), None);

    let outcome = divrot::run_command(
        AppCommand::Signal(RunOptions::default()),
        Some(config_path.to_str().unwrap()),
    )
    .await
    .expect("Signal run failed");
    assert_eq!(outcome, RunOutcome::Success);

    // Implausible 99% fell back to the configured default
    let cache: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("dividend_cache.json")).unwrap())
            .unwrap();
    info!(?cache, "Saved yield cache");
    assert_eq!(cache["rates"]["510720"], 5.1);
    assert_eq!(cache["rates"]["515180"], 4.2);
    assert_eq!(cache["rates"]["512890"], 4.8);
    assert_eq!(
        cache["last_update"],
        Local::now().date_naive().format("%Y-%m-%d").to_string()
    );
}

#[test_log::test(tokio::test)]
async fn test_recommendation_and_notification() {
    use divrot::RunOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let server = wiremock::MockServer::start().await;
    for code in ["510720", "515180", "512890"] {
        test_utils::mount_profile(&server, code, "4.00%").await;
    }
    test_utils::mount_history(&server, "510720", 200, test_utils::history_body(90, 1.0)).await;
    test_utils::mount_history(&server, "515180", 200, test_utils::history_body(90, 1.01)).await;
    test_utils::mount_history(&server, "512890", 200, test_utils::history_body(90, 0.99)).await;

    let push = wiremock::MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/SCTintegration.send"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code": 0}"#))
        .expect(1)
        .mount(&push)
        .await;

    let env_var = "DIVROT_IT_SENDKEY";
    // SAFETY: no other test reads or writes this variable
    unsafe { std::env::set_var(env_var, "SCTintegration") };

    let dir = tempfile::tempdir().unwrap();
    let config_path =
        test_utils::write_config(dir.path(), &server.uri(), Some((&push.uri(), env_var)));
    let config = divrot::load_config(Some(config_path.to_str().unwrap())).unwrap();

    let report = divrot::run_signal(&config, &RunOptions::default())
        .await
        .unwrap();
    let recommendation = report.recommendation.expect("Expected a recommendation");
    assert_eq!(recommendation.top().code, "515180");
    assert_eq!(recommendation.top().name, "中证红利ETF");
    assert_eq!(report.notified, Some(true));
}

#[test_log::test(tokio::test)]
async fn test_partial_and_total_price_failures() {
    use divrot::{AppCommand, RunOptions, RunOutcome};

    let server = wiremock::MockServer::start().await;
    for code in ["510720", "515180", "512890"] {
        test_utils::mount_profile(&server, code, "4.00%").await;
    }
    test_utils::mount_history(&server, "510720", 200, test_utils::history_body(80, 1.0)).await;
    // Too short for the 60-day lookback
    test_utils::mount_history(&server, "515180", 200, test_utils::history_body(59, 1.0)).await;
    test_utils::mount_history(&server, "512890", 502, String::new()).await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = test_utils::write_config(dir.path(), &server.uri(), None);

    let outcome = divrot::run_command(
        AppCommand::Signal(RunOptions::default()),
        Some(config_path.to_str().unwrap()),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::PartialData {
            missing: vec!["515180".to_string(), "512890".to_string()]
        }
    );

    // No history endpoint at all on a fresh server
    let empty = wiremock::MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = test_utils::write_config(dir.path(), &empty.uri(), None);
    let outcome = divrot::run_command(
        AppCommand::Signal(RunOptions::default()),
        Some(config_path.to_str().unwrap()),
    )
    .await
    .unwrap();
    assert_eq!(outcome, RunOutcome::NoPriceData);
    assert_eq!(outcome.exit_code(), 3);
}

#[test_log::test(tokio::test)]
async fn test_fresh_cache_is_reused() {
    use divrot::RunOptions;
    use divrot::core::yields::YieldSource;

    let server = wiremock::MockServer::start().await;
    for code in ["510720", "515180", "512890"] {
        test_utils::mount_history(&server, code, 200, test_utils::history_body(70, 1.0)).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let today = Local::now().date_naive();
    let cached = serde_json::json!({
        "last_update": (today - Duration::days(29)).format("%Y-%m-%d").to_string(),
        "rates": {"510720": 6.0, "515180": 5.0, "512890": 7.0}
    });
    fs::write(dir.path().join("dividend_cache.json"), cached.to_string()).unwrap();
    let config_path = test_utils::write_config(dir.path(), &server.uri(), None);
    let config = divrot::load_config(Some(config_path.to_str().unwrap())).unwrap();

    let report = divrot::run_signal(&config, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(report.yield_source, YieldSource::Cache);
    // All flat, so the highest cached yield wins
    assert_eq!(report.recommendation.unwrap().top().code, "512890");

    // Profiles are unreachable, so a forced refresh falls back to defaults
    let options = RunOptions {
        notify: false,
        refresh_yields: true,
    };
    let report = divrot::run_signal(&config, &options).await.unwrap();
    assert_eq!(report.yield_source, YieldSource::Fetched);
    assert_eq!(report.yields["510720"], 4.5);
    assert_eq!(report.recommendation.unwrap().top().code, "510720");
}
