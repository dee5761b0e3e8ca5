//! Both repository backends must behave the same for the decision write path.

use storage::{NewAlert, NewAqiRecord, NewPrediction, Repository};

async fn backends() -> Vec<Repository> {
    vec![
        Repository::new(),
        Repository::with_sqlite("sqlite::memory:", 1).await.unwrap(),
    ]
}

fn reading(aqi_value: i64) -> NewAqiRecord {
    NewAqiRecord {
        city: "Lucknow".to_string(),
        aqi_value,
        pm25: 88.0,
        pm10: 120.0,
        co: 0.0,
        no2: 0.0,
        o3: 0.0,
    }
}

fn prediction(user_id: i64, aqi_id: i64, label: &str, alert_triggered: bool) -> NewPrediction {
    NewPrediction {
        user_id,
        aqi_id,
        risk_label: label.to_string(),
        risk_score: 0.8123,
        alert_triggered,
    }
}

fn alert(severity: &str) -> NewAlert {
    NewAlert {
        message: format!("Health Alert ({})", severity),
        severity: severity.to_string(),
    }
}

#[tokio::test]
async fn every_alert_references_a_prediction_of_the_same_user() {
    for repo in backends().await {
        let aqi = repo.insert_aqi(reading(170)).await.unwrap();

        repo.persist_decision(prediction(5, aqi.aqi_id, "High", true), Some(alert("High")))
            .await
            .unwrap();
        repo.persist_decision(prediction(5, aqi.aqi_id, "Low", false), None)
            .await
            .unwrap();
        repo.persist_decision(
            prediction(6, aqi.aqi_id, "Moderate", true),
            Some(alert("Moderate")),
        )
        .await
        .unwrap();

        let predictions = repo.predictions_for_user(5, 50).await.unwrap();
        let alerts = repo.alerts_for_user(5, None, 50).await.unwrap();

        assert_eq!(predictions.len(), 2, "backend {}", repo.backend_name());
        assert_eq!(alerts.len(), 1, "backend {}", repo.backend_name());

        let linked = predictions
            .iter()
            .find(|p| p.prediction_id == alerts[0].alert.prediction_id)
            .unwrap();
        assert!(linked.alert_triggered);
        assert_eq!(linked.user_id, alerts[0].alert.user_id);
        assert_eq!(alerts[0].risk_label, "High");

        assert_eq!(repo.prediction_count().await.unwrap(), 3);
        assert_eq!(repo.alert_count().await.unwrap(), 2);
    }
}

#[tokio::test]
async fn mismatched_alert_pairing_writes_nothing() {
    for repo in backends().await {
        let aqi = repo.insert_aqi(reading(90)).await.unwrap();

        assert!(repo
            .persist_decision(prediction(1, aqi.aqi_id, "High", true), None)
            .await
            .is_err());
        assert!(repo
            .persist_decision(prediction(1, aqi.aqi_id, "Low", false), Some(alert("Moderate")))
            .await
            .is_err());

        assert_eq!(repo.prediction_count().await.unwrap(), 0);
        assert_eq!(repo.alert_count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn unknown_aqi_reference_is_rejected() {
    for repo in backends().await {
        let result = repo
            .persist_decision(prediction(1, 12345, "Low", false), None)
            .await;

        assert!(result.is_err(), "backend {}", repo.backend_name());
        assert_eq!(repo.prediction_count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn severity_filter_and_limit() {
    for repo in backends().await {
        let aqi = repo.insert_aqi(reading(200)).await.unwrap();
        for severity in ["Moderate", "Emergency", "Emergency", "High"] {
            repo.persist_decision(prediction(9, aqi.aqi_id, "High", true), Some(alert(severity)))
                .await
                .unwrap();
        }

        let emergencies = repo.alerts_for_user(9, Some("Emergency"), 50).await.unwrap();
        assert_eq!(emergencies.len(), 2);
        assert!(emergencies[0].alert.alert_id > emergencies[1].alert.alert_id);

        let latest = repo.alerts_for_user(9, None, 1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].alert.severity, "High");
    }
}
