mod common;

use common::{raw, valid_certificate, Fake, POLICY};
use webapp_renewal::{exit_code, FailureKind, Outcome, RawParameters, RenewalManager, Settings};

fn batch(raw_sets: impl IntoIterator<Item = Vec<(String, String)>>) -> Vec<RawParameters> {
	raw_sets.into_iter().map(|raw| raw.into_iter().collect()).collect()
}

#[tokio::test(start_paused = true)]
async fn renews_every_target() {
	let fake = Fake::default();
	fake.existing_certificates.borrow_mut().insert("app2".to_owned(), valid_certificate(&["*.example.net"], 90));
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);

	let results = manager.renew(&batch([
		raw("app1", "a.example.com;b.example.com"),
		raw("app2", "www.example.net"),
	])).await.unwrap();

	assert_eq!(results.len(), 2);
	assert_eq!(results[0].target.web_app, "app1");
	assert_eq!(results[0].outcome, Outcome::Succeeded);
	assert_eq!(results[0].hostnames, ["a.example.com", "b.example.com"]);
	assert_eq!(results[1].target.web_app, "app2");
	assert_eq!(results[1].outcome, Outcome::SucceededNoOp);
	assert_eq!(exit_code(&results), 0);

	assert_eq!(fake.calls_starting_with("create_order"), ["create_order a.example.com;b.example.com"]);
}

#[tokio::test(start_paused = true)]
async fn colliding_targets_make_no_calls() {
	let fake = Fake::default();
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);

	let mut same_target = raw("APP1", "c.example.com");
	same_target.retain(|(name, _)| name != "--tenantId");
	same_target.push(("-t".to_owned(), "t2".to_owned()));

	let err = manager.renew(&batch([
		raw("app1", "a.example.com"),
		raw("app2", "b.example.com"),
		same_target,
	])).await.unwrap_err();

	assert_eq!(err.request_index(), Some(2));
	assert!(err.to_string().contains("webApp"), "{err}");
	assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_target_makes_no_calls() {
	let fake = Fake::default();
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);

	let mut invalid = raw("app2", "b.example.com");
	invalid.retain(|(name, _)| name != "--subscriptionId");
	invalid.push(("-s".to_owned(), "00000000-0000-0000-0000-000000000000".to_owned()));

	let err = manager.renew(&batch([raw("app1", "a.example.com"), invalid])).await.unwrap_err();

	assert_eq!(err.request_index(), Some(1));
	assert!(err.to_string().contains("subscriptionId"), "{err}");
	assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn out_of_range_renewal_threshold_makes_no_calls() {
	let fake = Fake::default();
	fake.existing_certificates.borrow_mut().insert("app1".to_owned(), valid_certificate(&["a.example.com"], 60));
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);

	let mut far_threshold = raw("app1", "a.example.com");
	far_threshold.push(("-n".to_owned(), "4000000".to_owned()));

	let err = manager.renew(&batch([far_threshold, raw("app2", "b.example.com")])).await.unwrap_err();

	assert_eq!(err.request_index(), Some(0));
	assert!(err.to_string().contains("renewXNumberOfDaysBeforeExpiration"), "{err}");
	assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failures_are_isolated() {
	let fake = Fake::default();
	fake.fail("bind_certificate app2 sni");
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);

	let results = manager.renew(&batch([
		raw("app1", "a.example.com"),
		raw("app2", "b.example.com"),
		raw("app3", "c.example.com"),
	])).await.unwrap();

	assert_eq!(results[0].outcome, Outcome::Succeeded);
	assert!(matches!(&results[1].outcome, Outcome::Failed { kind: FailureKind::Binding, .. }));
	assert!(results[1].hostnames.is_empty());
	assert_eq!(results[2].outcome, Outcome::Succeeded);
	assert_eq!(exit_code(&results), 1);

	let mut bound: Vec<_> = fake.bound_certificates.borrow().keys().cloned().collect();
	bound.sort();
	assert_eq!(bound, ["app1", "app3"]);
	assert!(fake.web_root_files.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_still_cleans_up() {
	let fake = Fake::default();
	fake.verification.borrow_mut().insert("a.example.com".to_owned(), common::Verification::Never);
	fake.verification.borrow_mut().insert("b.example.com".to_owned(), common::Verification::Never);
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);
	let cancellation = tokio_util::sync::CancellationToken::new();

	let raw_sets = batch([raw("app1", "a.example.com"), raw("app2", "b.example.com")]);
	let ((), results) = tokio::join!(
		async {
			tokio::time::sleep(std::time::Duration::from_secs(2)).await;
			cancellation.cancel();
		},
		manager.renew_with_cancellation(&raw_sets, &cancellation),
	);
	let results = results.unwrap();

	for result in &results {
		assert!(matches!(result.outcome, Outcome::Failed { kind: FailureKind::Cancelled, .. }), "{result:?}");
	}
	assert_eq!(fake.calls_starting_with("remove_web_root_file").len(), 2);
	assert!(fake.web_root_files.borrow().is_empty());
	assert!(fake.calls_starting_with("bind_certificate").is_empty());
	assert_eq!(exit_code(&results), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_batch() {
	let fake = Fake::default();
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(Default::default(), fake.collaborators(), POLICY, &logger);

	let results = manager.renew(&[]).await.unwrap();
	assert!(results.is_empty());
	assert_eq!(exit_code(&results), 0);
}

#[tokio::test(start_paused = true)]
async fn renews_targets_from_settings() {
	let settings = Settings::from_json(&format!(r#"{{
		"defaults": {{ "rsa_key_length": 3072 }},
		"targets": [
			{{
				"subscriptionId": "{}",
				"tenantId": "t1",
				"resourceGroup": "rg1",
				"webApp": "app1",
				"hosts": "a.example.com",
				"email": "e@x.com",
				"clientId": "{}",
				"clientSecret": "secret",
				"useIpBasedSsl": true
			}}
		]
	}}"#, common::SUBSCRIPTION_ID, common::CLIENT_ID)).unwrap();

	let fake = Fake::default();
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(settings.defaults, fake.collaborators(), settings.policy, &logger);

	let results = manager.renew(&settings.targets).await.unwrap();

	assert_eq!(results[0].outcome, Outcome::Succeeded);
	assert_eq!(fake.calls_starting_with("create_csr"), ["create_csr app1 a.example.com 3072"]);
	assert_eq!(fake.calls_starting_with("bind_certificate"), ["bind_certificate app1 ip"]);
}

#[tokio::test(start_paused = true)]
async fn settings_defaults_are_checked_like_parameters() {
	let settings = Settings::from_json(&format!(r#"{{
		"defaults": {{ "rsa_key_length": 512, "azure_default_website_domain_name": "@@" }},
		"targets": [
			{{
				"subscriptionId": "{}",
				"tenantId": "t1",
				"resourceGroup": "rg1",
				"webApp": "app1",
				"hosts": "a.example.com",
				"email": "e@x.com",
				"clientId": "{}",
				"clientSecret": "secret"
			}}
		]
	}}"#, common::SUBSCRIPTION_ID, common::CLIENT_ID)).unwrap();

	let fake = Fake::default();
	let logger = log2::Logger::new(None);
	let manager = RenewalManager::new(settings.defaults, fake.collaborators(), settings.policy, &logger);

	let err = manager.renew(&settings.targets).await.unwrap_err();

	assert_eq!(err.request_index(), Some(0));
	assert_eq!(err.problems().len(), 2, "{err}");
	assert!(err.to_string().contains("rsaKeyLength"), "{err}");
	assert!(err.to_string().contains("azureDefaultWebsiteDomainName"), "{err}");
	assert!(fake.calls().is_empty());
}
