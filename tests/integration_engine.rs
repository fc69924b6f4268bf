use anyhow::Result;
use layerfix_core::cache::SkipCache;
use layerfix_core::engine::Engine;
use layerfix_core::error::PluginErrorKind;
use layerfix_core::fallback::Method;
use layerfix_core::layers::{LayerPlugin, LayerRegistry, PluginOutput, PluginResult, TransformContext};
use layerfix_core::pipeline::{Outcome, PipelineResult, RunOptions};
use layerfix_core::validator::Validator;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;

struct Throws;
impl LayerPlugin for Throws {
    fn regex_transform(&self, _: &str, _: &TransformContext<'_>) -> Option<PluginResult> {
        Some(Err(PluginErrorKind::Threw("plugin exploded".into())))
    }
}

/// Drops the `useState` import line, which the integrity check must catch.
struct DropsHookImport;
impl LayerPlugin for DropsHookImport {
    fn regex_transform(&self, code: &str, _: &TransformContext<'_>) -> Option<PluginResult> {
        Some(Ok(PluginOutput::new(
            code.replace("import { useState } from 'react';\n", ""),
        )))
    }
}

fn engine_with(id: u32, plugin: Arc<dyn LayerPlugin>) -> Engine {
    Engine::with_registry(
        LayerRegistry::builtin().with_plugin(id, plugin),
        Validator::default(),
    )
}

fn assert_snapshot_invariant(result: &PipelineResult) {
    let advanced = result
        .layer_results
        .iter()
        .filter(|r| r.success && !r.reverted)
        .count();
    assert_eq!(result.snapshots.len(), 1 + advanced);
    assert_eq!(result.snapshots.last(), Some(&result.final_code));
}

#[test]
fn entity_scenario_with_patterns_layer() -> Result<()> {
    let engine = Engine::default();
    let input = "const message = \"Hello &amp; Welcome\";\nconsole.log(message);";
    let result = engine.run(input, &[2], RunOptions::default(), Some(Path::new("src/message.js")))?;

    assert_eq!(
        result.final_code,
        "const message = \"Hello & Welcome\";\nconsole.log(message);"
    );
    let layer2 = result.result_for(2).map(|r| (r.success, r.change_count));
    assert_eq!(layer2, Some((true, 1)));
    assert_eq!(result.summary.failed_layers, 0);
    assert_snapshot_invariant(&result);
    Ok(())
}

#[test]
fn key_scenario_pulls_in_dependencies() -> Result<()> {
    let engine = Engine::default();
    let input = "items.map(item => <div>{item}</div>)";
    let result = engine.run(input, &[3], RunOptions::default(), Some(Path::new("List.jsx")))?;

    let resolution = result.resolution.clone().unwrap_or_default();
    assert_eq!(resolution.ordered, vec![1, 2, 3]);
    assert_eq!(resolution.auto_added, vec![1, 2]);
    assert!(result.final_code.contains("key={item.id ?? item}"));

    let layer3 = result.result_for(3);
    assert_eq!(layer3.map(|r| r.method_used), Some(Method::Ast));
    assert_eq!(layer3.map(|r| r.change_count), Some(1));
    assert_snapshot_invariant(&result);
    Ok(())
}

#[test]
fn fail_fast_stops_after_first_error() -> Result<()> {
    let engine = engine_with(2, Arc::new(Throws));
    let input = "items.map(item => <div>{item}</div>)";
    let options = RunOptions {
        fail_fast: true,
        ..RunOptions::default()
    };
    let result = engine.run(input, &[3], options, Some(Path::new("List.jsx")))?;

    assert_eq!(result.layer_results.len(), 2);
    assert_eq!(result.layer_results[1].outcome(), Outcome::Failed);
    assert!(result.layer_results[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("plugin exploded")));
    assert_eq!(result.final_code, input);
    assert_eq!(result.snapshots.len(), 2);
    assert!(result.has_failures());
    Ok(())
}

#[test]
fn failure_without_fail_fast_continues() -> Result<()> {
    let engine = engine_with(2, Arc::new(Throws));
    let input = "items.map(item => <div>{item}</div>)";
    let result = engine.run(input, &[3], RunOptions::default(), Some(Path::new("List.jsx")))?;

    assert_eq!(result.layer_results.len(), 3);
    assert!(result.final_code.contains("key="));
    assert_snapshot_invariant(&result);
    Ok(())
}

#[test]
fn removed_use_state_import_is_reverted() -> Result<()> {
    let engine = engine_with(2, Arc::new(DropsHookImport));
    let input = "import { useState } from 'react';\n\nexport function Counter() {\n  const [count, setCount] = useState(0);\n  return <button onClick={() => setCount(count + 1)}>{count}</button>;\n}\n";
    let result = engine.run(input, &[2], RunOptions::default(), Some(Path::new("Counter.jsx")))?;

    let layer2 = result.result_for(2);
    assert_eq!(layer2.map(|r| r.outcome()), Some(Outcome::Reverted));
    assert_eq!(layer2.map(|r| r.change_count), Some(0));
    assert!(layer2
        .and_then(|r| r.revert_reason.as_deref())
        .is_some_and(|reason| reason.contains("integrity") && reason.contains("useState")));
    assert_eq!(result.final_code, input);
    assert_eq!(result.summary.reverted_layers, 1);
    assert_snapshot_invariant(&result);
    Ok(())
}

#[test]
fn clean_pass_is_idempotent() -> Result<()> {
    let engine = Engine::default();
    let path = Path::new("List.jsx");
    let input = "const title = \"Tom &amp; Jerry\";\nitems.map(item => <div>{item}</div>)";

    let first = engine.run(input, &[3], RunOptions::default(), Some(path))?;
    assert!(first.summary.total_changes > 0);

    let second = engine.run(&first.final_code, &[3], RunOptions::default(), Some(path))?;
    assert_eq!(second.summary.total_changes, 0);
    assert_eq!(second.final_code, first.final_code);
    Ok(())
}

#[test]
fn cache_skips_known_no_ops() -> Result<()> {
    let cache = Arc::new(SkipCache::default());
    let engine = Engine::default().with_cache(Arc::clone(&cache));
    let input = "const message = \"Hello &amp; Welcome\";\n";
    let path = Some(Path::new("a.js"));

    let first = engine.run(input, &[2], RunOptions::default(), path)?;
    assert!(!first.layer_results[0].skipped);

    let second = engine.run(input, &[2], RunOptions::default(), path)?;
    assert!(second.layer_results[0].skipped);
    assert_eq!(second.layer_results[0].outcome(), Outcome::Skipped);
    assert_eq!(second.final_code, first.final_code);
    assert_eq!(cache.hits(), 1);
    assert_snapshot_invariant(&second);
    Ok(())
}

#[test]
fn jsx_text_entities_survive_patterns_layer() -> Result<()> {
    let engine = Engine::default();
    let input = "export const A = () => <p>Don't &lt;b&gt; won't</p>;";
    let result = engine.run(input, &[2], RunOptions::default(), Some(Path::new("A.jsx")))?;

    assert_eq!(result.final_code, input);
    let layer2 = result.result_for(2).ok_or_else(|| anyhow::anyhow!("no layer 2"))?;
    assert_eq!(layer2.change_count, 0);
    assert_eq!(layer2.outcome(), Outcome::Accepted);
    Ok(())
}

/// Rewrites JSX text entities, leaving invalid JSX behind.
struct UnescapesJsxText;
impl LayerPlugin for UnescapesJsxText {
    fn regex_transform(&self, code: &str, _: &TransformContext<'_>) -> Option<PluginResult> {
        Some(Ok(PluginOutput::new(code.replace("&lt;", "<").replace("&gt;", ">"))))
    }
}

#[test]
fn candidate_that_stops_parsing_is_reverted() -> Result<()> {
    let engine = engine_with(2, Arc::new(UnescapesJsxText));
    let input = "export const A = () => <p>Don't &lt;b&gt; won't</p>;";
    let result = engine.run(input, &[2], RunOptions::default(), Some(Path::new("A.jsx")))?;

    assert_eq!(result.final_code, input);
    let layer2 = result.result_for(2).ok_or_else(|| anyhow::anyhow!("no layer 2"))?;
    assert!(layer2.reverted);
    assert!(layer2
        .revert_reason
        .as_deref()
        .is_some_and(|r| r.contains("no longer parses")));
    Ok(())
}

#[test]
fn double_escaped_entity_is_stable_across_runs() -> Result<()> {
    let engine = Engine::default();
    let path = Some(Path::new("src/a.js"));
    let input = "const s = \"a &amp;lt; b\";\n";

    let first = engine.run(input, &[2], RunOptions::default(), path)?;
    assert_eq!(first.final_code, input);
    let second = engine.run(&first.final_code, &[2], RunOptions::default(), path)?;
    assert_eq!(second.final_code, input);
    assert_eq!(second.summary.total_changes, 0);
    Ok(())
}

const COMPONENT_TEST: &str = "import Button from './Button';\n\ntest('renders', () => {\n  render(<Button />);\n  expect(screen.getByText('Go')).toBeInTheDocument();\n});\n";

#[test]
fn cached_no_op_does_not_leak_across_paths() -> Result<()> {
    let cache = Arc::new(SkipCache::default());
    let engine = Engine::default().with_cache(Arc::clone(&cache));

    let story = engine.run(
        COMPONENT_TEST,
        &[6],
        RunOptions::default(),
        Some(Path::new("src/Stories.tsx")),
    )?;
    assert!(!story.changed());

    let test = engine.run(
        COMPONENT_TEST,
        &[6],
        RunOptions::default(),
        Some(Path::new("src/Button.test.tsx")),
    )?;
    let layer6 = test.result_for(6).ok_or_else(|| anyhow::anyhow!("no layer 6"))?;
    assert!(!layer6.skipped);
    assert_eq!(layer6.change_count, 2);
    assert!(test.final_code.contains("from '@testing-library/react';"));
    assert!(test.final_code.contains("import '@testing-library/jest-dom';"));
    Ok(())
}

#[test]
fn dry_run_still_computes_the_result() -> Result<()> {
    let engine = Engine::default();
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };
    let result = engine.run("let a = 1;;\n", &[2], options, Some(Path::new("a.ts")))?;
    assert!(result.dry_run);
    assert_eq!(result.final_code, "let a = 1;\n");
    Ok(())
}

#[test]
fn analyzer_recommends_hydration_chain() {
    let engine = Engine::default();
    let code = "export function Theme() {\n  const theme = localStorage.getItem('theme');\n  return <div>{theme}</div>;\n}\n";
    let report = engine.analyze(code, Some(Path::new("components/Theme.jsx")));

    assert!(report.issues.iter().any(|i| i.fixed_by_layer == 4));
    assert_eq!(report.recommended_layers, vec![1, 2, 3, 4]);
    assert!(report.confidence >= 0.6 && report.confidence <= 0.95);
}

#[test]
fn results_serialize_to_json() -> Result<()> {
    let engine = Engine::default();
    let result = engine.run("let a = 1;;\n", &[2], RunOptions::default(), None)?;
    let json = serde_json::to_value(&result)?;
    assert_eq!(json["summary"]["successful_layers"], 2);
    assert_eq!(json["layer_results"][1]["method_used"], "regex");
    assert_eq!(json["resolution"]["auto_added"][0], 1);
    Ok(())
}
