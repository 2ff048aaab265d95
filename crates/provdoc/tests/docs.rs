//! End-to-end rendering of provider descriptions.

use provdoc::{DocRenderer, DocsConfig, EngineKind, Error};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const RESOURCE_DOC: &str = r#"---
page_title: "{{ .Name }} {{ lower .Type }} - {{ .ProviderName }}"
subcategory: "{{ .subcategory }}"
---

# {{ .Name }} ({{ title .Type }})

{{ plainmarkdown .Description | trimspace | prefixlines "  " }}
"#;

const NETBOX_PREFIX: &str = ":meta:subcategory:IP Address Management (IPAM):From the [official documentation](https://docs.netbox.dev/en/stable/features/ipam/#prefixes):

> A prefix is an IPv4 or IPv6 network and mask expressed in CIDR notation.";

#[test]
fn directive_document() {
    init_tracing();
    let renderer = DocRenderer::new(DocsConfig::default()).unwrap();
    let mut context = match provdoc::document_context(renderer.split(NETBOX_PREFIX)) {
        serde_json::Value::Object(map) => map,
        other => panic!("unexpected context {:?}", other),
    };
    context.insert("Name".into(), "netbox_prefix".into());
    context.insert("Type".into(), "Resource".into());
    context.insert("ProviderName".into(), "netbox".into());

    let out = renderer.render("resource", RESOURCE_DOC, &context).unwrap();
    assert_eq!(
        out,
        r#"---
page_title: "netbox_prefix resource - netbox"
subcategory: "IP Address Management (IPAM)"
---

# netbox_prefix (Resource)

  From the official documentation:
  
  A prefix is an IPv4 or IPv6 network and mask expressed in CIDR notation.
"#
    );
}

#[test]
fn engines_agree_on_described_render() {
    init_tracing();
    let directive = DocRenderer::new(DocsConfig::default()).unwrap();
    let jinja = DocRenderer::from_yaml("engine: jinja").unwrap();
    assert_eq!(jinja.config().engine, EngineKind::Jinja);

    let full = ":meta:subcategory:Tenancy:manages **tenants**";
    assert_eq!(
        directive
            .render_described("d", "{{ upper .subcategory }}/{{ title .Description }}", full)
            .unwrap(),
        jinja
            .render_described("j", "{{ subcategory | upper }}/{{ Description | title }}", full)
            .unwrap(),
    );
}

#[test]
fn metadata_map_in_context() {
    let renderer = DocRenderer::new(DocsConfig::default()).unwrap();
    let out = renderer
        .render_described("t", "{{ index .Metadata \"deprecated\" }}", ":meta:deprecated:yes:x")
        .unwrap();
    assert_eq!(out, "yes");
}

#[test]
fn yaml_config_with_custom_delimiter() {
    let renderer = DocRenderer::from_yaml("delimiter: \"|\"\nmeta_marker: doc\n").unwrap();
    let out = renderer
        .render_described("t", "{{ .owner }}: {{ .Description }}", "|doc|owner|ops|Runs things.")
        .unwrap();
    assert_eq!(out, "ops: Runs things.");
}

#[test]
fn bad_yaml_is_config_error() {
    let err = DocRenderer::from_yaml("delimiter: [").unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
}

#[test]
fn render_error_surfaces_template_name() {
    let renderer = DocRenderer::new(DocsConfig::default()).unwrap();
    let err = renderer
        .render_described("netbox_prefix.md", "{{ nosuchfn .Description }}", "text")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "template: netbox_prefix.md:1:4: function \"nosuchfn\" not defined"
    );
}

proptest! {
    #[test]
    fn description_round_trips_through_template(
        subcategory in "[A-Za-z][A-Za-z ()]{0,20}",
        description in "[A-Za-z .,]{0,60}",
    ) {
        let renderer = DocRenderer::new(DocsConfig::default()).unwrap();
        let full = format!(":meta:subcategory:{}:{}", subcategory, description);
        let out = renderer
            .render_described("t", "{{ .subcategory }}|{{ .Description }}", &full)
            .unwrap();
        prop_assert_eq!(out, format!("{}|{}", subcategory, description));
    }
}
