//! Prompt rendering golden tests.
//!
//! Each case renders a template with fixed variables and checks that the
//! result carries what the model needs and no unfilled placeholders.

use hearth_llm::prompt;

struct GoldenCase {
    name: &'static str,
    template: &'static str,
    vars: Vec<(&'static str, &'static str)>,
    prompt_must_contain: Vec<&'static str>,
    prompt_must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            name: "wary_scavenger",
            template: prompt::EMOTION_CLASSIFY,
            vars: vec![
                ("user", "I just want to trade."),
                ("npc_name", "Jace"),
                ("reply", "Hands where I can see them. Then we talk."),
            ],
            prompt_must_contain: vec![
                "Classify emotion:",
                "Player: I just want to trade.",
                "| Jace: Hands where I can see them.",
            ],
            prompt_must_not_contain: vec!["{user}", "{npc_name}", "{reply}"],
        },
        GoldenCase {
            name: "grieving_medic",
            template: prompt::EMOTION_CLASSIFY,
            vars: vec![
                ("user", "Did anyone make it out of the clinic?"),
                ("npc_name", "Ada"),
                ("reply", "No. I was the last one to leave."),
            ],
            prompt_must_contain: vec!["Ada: No.", "clinic"],
            prompt_must_not_contain: vec!["{", "}"],
        },
        GoldenCase {
            name: "braces_in_player_text_survive",
            template: prompt::EMOTION_CLASSIFY,
            vars: vec![
                ("user", "say {something}"),
                ("npc_name", "Rook"),
                ("reply", "Fine."),
            ],
            prompt_must_contain: vec!["say {something}", "Rook: Fine."],
            prompt_must_not_contain: vec!["{npc_name}"],
        },
    ]
}

#[test]
fn golden_prompts_render() {
    for case in golden_cases() {
        let rendered = prompt::render_template(case.template, &case.vars);
        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "[{}] missing {needle:?} in {rendered:?}",
                case.name
            );
        }
        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "[{}] unexpected {needle:?} in {rendered:?}",
                case.name
            );
        }
    }
}

#[test]
fn helper_matches_template() {
    let via_helper = prompt::classify_emotion_prompt("hi", "Jace", "Go away.");
    let via_template = prompt::render_template(
        prompt::EMOTION_CLASSIFY,
        &[("user", "hi"), ("npc_name", "Jace"), ("reply", "Go away.")],
    );
    assert_eq!(via_helper, via_template);
}
