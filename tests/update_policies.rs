use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;
use workload_policy::{
    ConstNamespacer, Error, Manifests, Policy, PolicyUpdate, ResourceId, Set,
};

/// The fixture Deployment, with `pairs` as its annotations (none: no block).
fn annotated(pairs: &[(&str, &str)]) -> String {
    let mut annotations = String::new();
    if !pairs.is_empty() {
        annotations.push_str("\n  annotations:");
        for (key, value) in pairs {
            annotations.push_str(&format!("\n    {key}: {value}"));
        }
    }
    format!(
        "---
apiVersion: extensions/v1beta1
kind: Deployment
metadata: # comment really close to the war zone
  name: nginx{annotations}
spec:
  replicas: 1
  template:
    metadata: # comment2
      labels:
        name: nginx
    spec:
      containers:
      - image: nginx  # These keys are purposefully un-sorted.
        name: nginx   # And these comments are testing comments.
        ports:
        - containerPort: 80
"
    )
}

fn manifests() -> Manifests<ConstNamespacer> {
    Manifests::new(ConstNamespacer::new("default"))
}

fn nginx() -> ResourceId {
    "default:deployment/nginx".parse().expect("valid id")
}

fn set(pairs: &[(Policy, &str)]) -> Set {
    pairs
        .iter()
        .map(|(policy, value)| (policy.clone(), value.to_string()))
        .collect()
}

fn update(def: &str, add: &[(Policy, &str)], remove: &[(Policy, &str)]) -> Result<String, Error> {
    let update = PolicyUpdate::new(set(add), set(remove));
    let out = manifests().update_workload_policies(def.as_bytes(), &nginx(), &update)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

#[rstest]
#[case::adding_annotation_with_others_existing(
    &[("prometheus.io/scrape", "'false'")],
    &[("prometheus.io/scrape", "'false'"), ("flux.weave.works/automated", "'true'")],
    &[(Policy::Automated, "true")],
    &[],
)]
#[case::adding_annotation_when_already_has_annotation(
    &[("flux.weave.works/automated", "'true'")],
    &[("flux.weave.works/automated", "'true'")],
    &[(Policy::Automated, "true")],
    &[],
)]
#[case::adding_annotation_when_already_has_annotation_and_others(
    &[("flux.weave.works/automated", "'true'"), ("prometheus.io/scrape", "'false'")],
    &[("flux.weave.works/automated", "'true'"), ("prometheus.io/scrape", "'false'")],
    &[(Policy::Automated, "true")],
    &[],
)]
#[case::adding_first_annotation(
    &[],
    &[("flux.weave.works/automated", "'true'")],
    &[(Policy::Automated, "true")],
    &[],
)]
#[case::add_and_remove_different_annotations_at_the_same_time(
    &[("flux.weave.works/automated", "'true'"), ("prometheus.io/scrape", "'false'")],
    &[("prometheus.io/scrape", "'false'"), ("flux.weave.works/locked", "'true'")],
    &[(Policy::Locked, "true")],
    &[(Policy::Automated, "true")],
)]
#[case::keep_chomped_value_keeps_its_trailing_lines(
    &[("note", "|+\n      hello\n\n")],
    &[("note", "|+\n      hello\n\n"), ("flux.weave.works/automated", "'true'")],
    &[(Policy::Automated, "true")],
    &[],
)]
#[case::remove_overrides_add_for_same_key(
    &[],
    &[],
    &[(Policy::Locked, "true")],
    &[(Policy::Locked, "true")],
)]
#[case::remove_overrides_add_for_existing_key(
    &[("flux.weave.works/locked", "'true'"), ("prometheus.io/scrape", "'false'")],
    &[("prometheus.io/scrape", "'false'")],
    &[(Policy::Locked, "true")],
    &[(Policy::Locked, "true")],
)]
#[case::remove_annotation_with_others_existing(
    &[("flux.weave.works/automated", "true"), ("prometheus.io/scrape", "false")],
    &[("prometheus.io/scrape", "false")],
    &[],
    &[(Policy::Automated, "true")],
)]
#[case::remove_last_annotation(
    &[("flux.weave.works/automated", "true")],
    &[],
    &[],
    &[(Policy::Automated, "true")],
)]
#[case::remove_annotation_with_no_annotations(
    &[],
    &[],
    &[],
    &[(Policy::Automated, "true")],
)]
#[case::remove_annotation_with_only_others(
    &[("prometheus.io/scrape", "false")],
    &[("prometheus.io/scrape", "false")],
    &[],
    &[(Policy::Automated, "true")],
)]
#[case::remove_ignores_the_stored_value(
    &[("flux.weave.works/automated", "'false'")],
    &[],
    &[],
    &[(Policy::Automated, "true")],
)]
#[case::multiline(
    &[("flux.weave.works/locked_msg", "|-\n      first\n      second")],
    &[],
    &[],
    &[(Policy::LockedMsg, "foo")],
)]
#[case::multiline_with_empty_line(
    &[("flux.weave.works/locked_msg", "|-\n      first\n\n      third")],
    &[],
    &[],
    &[(Policy::LockedMsg, "foo")],
)]
#[case::multiline_kept_when_removing_another(
    &[("flux.weave.works/locked_msg", "|-\n      first\n\n      third"), ("flux.weave.works/locked", "'true'")],
    &[("flux.weave.works/locked_msg", "|-\n      first\n\n      third")],
    &[],
    &[(Policy::Locked, "")],
)]
#[case::add_tag_policy(
    &[],
    &[("flux.weave.works/tag.nginx", "glob:*")],
    &[(Policy::tag("nginx"), "glob:*")],
    &[],
)]
#[case::add_non_glob_tag_policy(
    &[],
    &[("flux.weave.works/tag.nginx", "foo")],
    &[(Policy::tag("nginx"), "foo")],
    &[],
)]
#[case::add_semver_tag_policy(
    &[],
    &[("flux.weave.works/tag.nginx", "semver:*")],
    &[(Policy::tag("nginx"), "semver:*")],
    &[],
)]
#[case::add_regexp_tag_policy(
    &[],
    &[("flux.weave.works/tag.nginx", "regexp:(.*?)")],
    &[(Policy::tag("nginx"), "regexp:(.*?)")],
    &[],
)]
#[case::set_tag_to_all_containers(
    &[],
    &[("flux.weave.works/tag.nginx", "semver:*")],
    &[(Policy::tag_all(), "semver:*")],
    &[],
)]
#[case::set_match_everything_tag_to_all_containers_removes_filters(
    &[("flux.weave.works/tag.nginx", "semver:*")],
    &[],
    &[(Policy::tag_all(), "glob:*")],
    &[],
)]
#[case::new_keys_follow_the_add_order(
    &[("prometheus.io/scrape", "'false'")],
    &[
        ("prometheus.io/scrape", "'false'"),
        ("flux.weave.works/tag.nginx", "semver:~1.2"),
        ("flux.weave.works/automated", "'true'"),
        ("flux.weave.works/locked_msg", "'deploy: frozen'"),
    ],
    &[
        (Policy::tag("nginx"), "semver:~1.2"),
        (Policy::Automated, "true"),
        (Policy::LockedMsg, "deploy: frozen"),
    ],
    &[],
)]
fn updates_policies(
    #[case] input: &[(&str, &str)],
    #[case] expected: &[(&str, &str)],
    #[case] add: &[(Policy, &str)],
    #[case] remove: &[(Policy, &str)],
) {
    let out = update(&annotated(input), add, remove).expect("update succeeds");
    assert_eq!(out, annotated(expected));
}

#[rstest]
#[case::invalid_semver(&[(Policy::tag("nginx"), "semver:invalid")])]
#[case::invalid_regexp(&[(Policy::tag("nginx"), "regexp:*")])]
#[case::invalid_tag_all(&[(Policy::tag_all(), "semver:invalid")])]
#[case::one_bad_among_good(&[
    (Policy::Automated, "true"),
    (Policy::tag("nginx"), "semver:~1"),
    (Policy::tag("sidecar"), "regexp:(")
])]
fn invalid_tag_patterns_fail_without_output(#[case] add: &[(Policy, &str)]) {
    let Err(err) = update(&annotated(&[]), add, &[]) else {
        panic!("update should be rejected");
    };
    assert!(matches!(err, Error::InvalidPattern { .. }), "{err}");
}

#[test]
fn invalid_tag_pattern_is_rejected_before_reading_the_manifest() {
    let update = PolicyUpdate::new(set(&[(Policy::tag("nginx"), "semver:invalid")]), Set::new());
    let err = manifests()
        .update_workload_policies(&[0xff, 0xfe], &nginx(), &update)
        .expect_err("invalid pattern");
    assert!(matches!(err, Error::InvalidPattern { .. }), "{err}");
}

#[test]
fn unknown_resource_is_reported() {
    let id: ResourceId = "default:deployment/missing".parse().expect("valid id");
    let update = PolicyUpdate::new(set(&[(Policy::Automated, "true")]), Set::new());
    let err = manifests()
        .update_workload_policies(annotated(&[]).as_bytes(), &id, &update)
        .expect_err("not found");
    assert_eq!(err, Error::ResourceNotFound { id });
}

#[test]
fn namespace_must_match() {
    let id: ResourceId = "prod:deployment/nginx".parse().expect("valid id");
    let update = PolicyUpdate::new(set(&[(Policy::Automated, "true")]), Set::new());
    let err = manifests()
        .update_workload_policies(annotated(&[]).as_bytes(), &id, &update)
        .expect_err("wrong namespace");
    assert!(matches!(err, Error::ResourceNotFound { .. }), "{err}");
}

#[test]
fn inconsistent_annotation_indentation_is_malformed() {
    let def = annotated(&[("a", "b")]).replace("    a: b", "    a: b\n   c: d");
    let err = update(&def, &[(Policy::Automated, "true")], &[]).expect_err("malformed");
    assert!(matches!(err, Error::MalformedManifest { line: 8, .. }), "{err}");
}

#[test]
fn appending_after_a_keep_chomped_value_preserves_it() {
    let def = annotated(&[("note", "|+\n      hello\n\n")]);
    let out = update(&def, &[(Policy::Automated, "true")], &[]).expect("update succeeds");

    let note = |text: &str| {
        let doc: serde_yaml::Value = serde_yaml::from_str(text).expect("valid yaml");
        doc["metadata"]["annotations"]["note"].clone()
    };
    assert_eq!(note(&def), "hello\n\n\n");
    assert_eq!(note(&out), note(&def));
}

#[test]
fn flow_style_metadata_is_malformed() {
    let def = annotated(&[]).replace(
        "metadata: # comment really close to the war zone\n  name: nginx",
        "metadata: {name: nginx}",
    );
    let err = update(&def, &[(Policy::Automated, "true")], &[]).expect_err("malformed");
    assert!(matches!(err, Error::MalformedManifest { line: 4, .. }), "{err}");
}

#[test]
fn empty_annotations_are_dropped_by_a_removal() {
    let def = annotated(&[]).replace("  name: nginx", "  name: nginx\n  annotations: {}");
    let out = update(&def, &[], &[(Policy::Automated, "true")]).expect("update succeeds");
    assert_eq!(out, annotated(&[]));
}

#[test]
fn byte_order_mark_is_kept_and_skipped() {
    let def = format!("\u{feff}{}", annotated(&[]));
    let out = update(&def, &[(Policy::Automated, "true")], &[]).expect("update succeeds");
    assert_eq!(
        out,
        format!("\u{feff}{}", annotated(&[("flux.weave.works/automated", "'true'")]))
    );
}

#[test]
fn non_utf8_manifests_are_rejected() {
    let update = PolicyUpdate::new(set(&[(Policy::Automated, "true")]), Set::new());
    let err = manifests()
        .update_workload_policies(&[b'k', 0xff], &nginx(), &update)
        .expect_err("not utf-8");
    assert!(matches!(err, Error::NotUtf8(_)), "{err}");
}

const MULTI: &str = "\
# leading comment
---
apiVersion: v1
kind: Service
metadata:
  name: nginx
spec:
  ports: [{port: 80}]
---
apiVersion: apps/v1
kind: Deployment
metadata:
    name: nginx
    namespace: web   # explicit
    annotations:
        flux.weave.works/locked: 'true'
        flux.weave.works/locked_msg: >
            folded
            message
spec:
    template:
        spec:
            initContainers:
                - name: migrate
                  image: migrate:1
            containers:
                - name: app
                  image: app:1.0.0
---
kind: Deployment
metadata:
  name: nginx
";

#[test]
fn only_the_target_resource_changes() {
    let id: ResourceId = "web:deployment/nginx".parse().expect("valid id");
    let update = PolicyUpdate::new(
        set(&[(Policy::tag_all(), "semver:^1")]),
        set(&[(Policy::Locked, "")]),
    );
    let out = manifests()
        .update_workload_policies(MULTI.as_bytes(), &id, &update)
        .expect("update succeeds");
    let expected = MULTI.replace(
        "        flux.weave.works/locked: 'true'\n        flux.weave.works/locked_msg: >\n            folded\n            message\n",
        "        flux.weave.works/locked_msg: >\n            folded\n            message\n        flux.weave.works/tag.migrate: semver:^1\n        flux.weave.works/tag.app: semver:^1\n",
    );
    assert_eq!(String::from_utf8(out).expect("utf-8"), expected);
}

#[test]
fn updated_output_still_parses_with_the_expected_annotations() {
    let id: ResourceId = "web:deployment/nginx".parse().expect("valid id");
    let update = PolicyUpdate::new(
        set(&[(Policy::Automated, "true"), (Policy::LockedUser, "o'brien")]),
        set(&[(Policy::LockedMsg, "")]),
    );
    let out = manifests()
        .update_workload_policies(MULTI.as_bytes(), &id, &update)
        .expect("update succeeds");
    let text = String::from_utf8(out).expect("utf-8");

    let docs: Vec<serde_yaml::Value> = serde_yaml::Deserializer::from_str(&text)
        .map(|doc| serde_yaml::Value::deserialize(doc).expect("valid yaml"))
        .collect();
    let web = docs
        .iter()
        .find(|doc| doc["metadata"]["namespace"] == "web")
        .expect("web deployment");
    let annotations = &web["metadata"]["annotations"];
    assert_eq!(annotations["flux.weave.works/locked"], "true");
    assert_eq!(annotations["flux.weave.works/automated"], "true");
    assert_eq!(annotations["flux.weave.works/locked_user"], "o'brien");
    assert!(annotations.get("flux.weave.works/locked_msg").is_none());
}

#[test]
fn undeclared_namespaces_fall_back_to_the_default() {
    let id: ResourceId = "default:deployment/nginx".parse().expect("valid id");
    let update = PolicyUpdate::new(set(&[(Policy::Automated, "true")]), Set::new());
    let out = manifests()
        .update_workload_policies(MULTI.as_bytes(), &id, &update)
        .expect("update succeeds");
    assert_eq!(
        String::from_utf8(out).expect("utf-8"),
        format!("{MULTI}  annotations:\n    flux.weave.works/automated: 'true'\n")
    );
}

#[test]
fn reads_current_policies() {
    let id: ResourceId = "web:deployment/nginx".parse().expect("valid id");
    let policies = manifests()
        .workload_policies(MULTI.as_bytes(), &id)
        .expect("policies");
    assert_eq!(policies.get(&Policy::Locked), Some("true"));
    assert_eq!(policies.get(&Policy::LockedMsg), Some("folded message\n"));
    assert_eq!(policies.len(), 2);
}

#[test]
fn lists_resource_ids() {
    let ids: Vec<String> = manifests()
        .resource_ids(MULTI.as_bytes())
        .expect("ids")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        ids,
        vec![
            "default:service/nginx",
            "web:deployment/nginx",
            "default:deployment/nginx",
        ]
    );
}

#[test]
fn adding_present_policies_is_byte_identical() {
    let def = MULTI.replace("\n", "\r\n");
    let id: ResourceId = "web:deployment/nginx".parse().expect("valid id");
    let update = PolicyUpdate::new(set(&[(Policy::Locked, "false")]), Set::new());
    let out = manifests()
        .update_workload_policies(def.as_bytes(), &id, &update)
        .expect("update succeeds");
    assert_eq!(out, def.as_bytes());
}
