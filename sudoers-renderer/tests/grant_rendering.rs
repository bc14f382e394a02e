use rstest::rstest;

use sudoers_core::DesiredGrant;
use sudoers_renderer::Renderer;

#[rstest]
#[case("testapp", &["xavier", "donalias"], "xavier, donalias ALL = (testapp) ALL")]
#[case("testapp", &["xavier"], "xavier ALL = (testapp) ALL")]
#[case("testapp", &["don"], "don ALL = (testapp) ALL")]
#[case("billing", &["%finance", "alice", "bob"], "%finance, alice, bob ALL = (billing) ALL")]
fn renders_expected_rule(#[case] app: &str, #[case] principals: &[&str], #[case] expected: &str) {
    let renderer = Renderer::new().expect("renderer");
    let grant = DesiredGrant::new(app, principals.iter().copied());
    assert_eq!(renderer.render_grant(&grant).expect("render"), expected);
}

#[test]
fn rendering_is_deterministic() {
    let renderer = Renderer::new().expect("renderer");
    let grant = DesiredGrant::new("testapp", ["xavier", "donalias"]);
    let first = renderer.render_grant(&grant).expect("first");
    let second = renderer.render_grant(&grant).expect("second");
    let fresh = Renderer::new()
        .expect("second renderer")
        .render_grant(&grant)
        .expect("fresh");
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(first.as_bytes(), fresh.as_bytes());
}

#[test]
fn principal_order_is_preserved() {
    let renderer = Renderer::new().expect("renderer");
    let forward = renderer
        .render_grant(&DesiredGrant::new("app", ["a", "b"]))
        .expect("forward");
    let reverse = renderer
        .render_grant(&DesiredGrant::new("app", ["b", "a"]))
        .expect("reverse");
    assert_eq!(forward, "a, b ALL = (app) ALL");
    assert_eq!(reverse, "b, a ALL = (app) ALL");
}
