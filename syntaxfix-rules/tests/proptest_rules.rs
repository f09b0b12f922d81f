use proptest::prelude::*;
use syntaxfix_rules::scope::{Dialect, ScopeMap};
use syntaxfix_rules::{builtin_rule_set, ApplyContext, RuleSet};

const CODE: &[&str] = &[
    "interface A {\n  items[];\n}\n",
    "interface B {\n  tags: string: any[];\n}\n",
    "interface C {\n  [key: string];\n}\n",
    "type D = { list[]; count: number };\n",
    "function f(values[], n) {\n  return n;\n}\n",
    "const x = useState<Post: any[]>([]);\n",
    "const y = z as Row: any[];\n",
    "let u: string | Item: any[];\n",
    "const ok: number[] = [1, 2];\n",
    "class K {\n  private rows[];\n  run(a) {\n    return a[0];\n  }\n}\n",
];

/// Valid TypeScript that resembles a corruption and must come through untouched.
const VALID: &[&str] = &[
    "interface V {\n  args: [value: string];\n  pair: [first: number, second: number];\n}\n",
    "type Lookup = { [id: number]: Post };\n",
    "interface W {\n  readonly [key: string]: unknown;\n}\n",
    "const m: Map<string, number[]> = new Map();\n",
    "let rows: Array<Item> = [];\n",
    "function g(items: number[], n: number) {\n  return items[n];\n}\n",
    "const pick = (pair: [a: string, b: number]) => pair[0];\n",
];

const CORRUPT: &[&str] = &["items[];", "tags: string: any[];", "[key: string];", "x: any: any[]"];

fn rules() -> RuleSet {
    builtin_rule_set().expect("builtin catalog")
}

#[derive(Debug, Clone)]
enum Piece {
    Code(&'static str),
    Str(&'static str),
    Comment(&'static str),
    BlockComment(&'static str),
    Template(&'static str),
    Markup(&'static str),
    Valid(&'static str),
}

fn piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        prop::sample::select(CODE).prop_map(Piece::Code),
        prop::sample::select(CORRUPT).prop_map(Piece::Str),
        prop::sample::select(CORRUPT).prop_map(Piece::Comment),
        prop::sample::select(CORRUPT).prop_map(Piece::BlockComment),
        prop::sample::select(CORRUPT).prop_map(Piece::Template),
        prop::sample::select(CORRUPT).prop_map(Piece::Markup),
        prop::sample::select(VALID).prop_map(Piece::Valid),
    ]
}

fn render(pieces: &[Piece]) -> (String, Vec<String>) {
    let mut text = String::new();
    let mut literals = Vec::new();
    for p in pieces {
        match p {
            Piece::Code(c) => text.push_str(c),
            Piece::Str(s) => {
                let lit = format!("const s = \"{s}\";\n");
                literals.push(format!("\"{s}\""));
                text.push_str(&lit);
            }
            Piece::Comment(s) => {
                let lit = format!("// {s}\n");
                literals.push(lit.trim_end().to_string());
                text.push_str(&lit);
            }
            Piece::BlockComment(s) => {
                literals.push(format!("/* {s} */"));
                text.push_str(&format!("/* {s} */\n"));
            }
            Piece::Template(s) => {
                literals.push(format!("`{s}`"));
                text.push_str(&format!("const t = `{s}`;\n"));
            }
            Piece::Markup(s) => {
                literals.push(format!("<p>{s}</p>"));
                text.push_str(&format!("const m = <p>{s}</p>;\n"));
            }
            Piece::Valid(v) => {
                literals.push(v.to_string());
                text.push_str(v);
            }
        }
    }
    (text, literals)
}

/// Markup only parses as such in `.tsx`.
fn path_for(pieces: &[Piece]) -> &'static str {
    if pieces.iter().any(|p| matches!(p, Piece::Markup(_))) {
        "src/gen.tsx"
    } else {
        "src/gen.ts"
    }
}

fn converge(set: &RuleSet, text: &str, path: &str) -> String {
    let ctx = ApplyContext::for_path(path);
    let mut current = text.to_string();
    for _ in 0..10 {
        let out = set.apply_pass(&current, &ctx);
        if !out.changed {
            break;
        }
        current = out.text;
    }
    current
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn literals_survive_repair(pieces in prop::collection::vec(piece(), 1..12)) {
        let set = rules();
        let (text, literals) = render(&pieces);
        let repaired = converge(&set, &text, path_for(&pieces));
        for lit in literals {
            prop_assert!(repaired.contains(&lit), "literal {lit:?} was altered");
        }
    }

    #[test]
    fn repaired_text_is_a_fixed_point(pieces in prop::collection::vec(piece(), 1..12)) {
        let set = rules();
        let (text, _) = render(&pieces);
        let path = path_for(&pieces);
        let repaired = converge(&set, &text, path);
        let again = set.apply_pass(&repaired, &ApplyContext::for_path(path));
        prop_assert!(!again.changed);
    }

    #[test]
    fn valid_lookalikes_are_left_alone(pieces in prop::collection::vec(prop::sample::select(VALID), 1..8)) {
        let set = rules();
        let text: String = pieces.concat();
        for path in ["src/gen.ts", "src/gen.tsx"] {
            prop_assert_eq!(converge(&set, &text, path), text.clone());
        }
    }

    #[test]
    fn arbitrary_text_never_panics(text in any::<String>()) {
        let set = rules();
        let _ = set.apply_pass(&text, &ApplyContext::for_path("src/gen.tsx"));
    }

    #[test]
    fn spans_tile_the_input(text in "[a-z{}()\\[\\]<>/*`'\"$ \n:;]{0,80}") {
        for dialect in [Dialect::Script, Dialect::Markup] {
            let map = ScopeMap::scan(&text, dialect);
            let mut at = 0;
            for span in map.spans() {
                prop_assert_eq!(span.start, at);
                prop_assert!(span.end > span.start);
                at = span.end;
            }
            prop_assert_eq!(at, text.len());
        }
    }
}
