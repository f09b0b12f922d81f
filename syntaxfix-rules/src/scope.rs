//! Lightweight tokenizer that decides where a rule may fire.
//!
//! Every byte of the input is classified as code or as literal text (string,
//! template, comment, regex literal, markup). On top of that, brackets are
//! tracked as frames so guards can ask "is this inside an interface body?" or
//! "is this inside a parameter list?". The scanner never fails: on broken
//! input it recovers by closing or ignoring mismatched brackets, erring on the
//! side of hiding text from rules.

/// Source dialect, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Script,
    /// Script with embedded markup (`.tsx`, `.jsx`).
    Markup,
}

impl Dialect {
    pub fn for_path(path: &str) -> Self {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("tsx") | Some("jsx") => Dialect::Markup,
            _ => Dialect::Script,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Code,
    StringLit,
    Template,
    LineComment,
    BlockComment,
    RegexLit,
    Markup,
}

impl SpanKind {
    pub fn is_code(self) -> bool {
        matches!(self, SpanKind::Code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Interface, type-literal or enum body.
    TypeBody,
    ClassBody,
    /// Statement block or object literal.
    Block,
    /// Call arguments, grouping, conditions.
    Parens,
    ParamList,
    Brackets,
}

impl FrameKind {
    pub fn is_declaration_body(self) -> bool {
        matches!(self, FrameKind::TypeBody | FrameKind::ClassBody)
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    open: usize,
    close: usize,
    parent: Option<usize>,
    hint: ParenHint,
}

#[derive(Debug, Clone, Copy, Default)]
struct ParenHint {
    after_function: bool,
    after_word: bool,
    after_control: bool,
    after_catch: bool,
    has_assign: bool,
}

/// Classification of one text buffer.
#[derive(Debug, Clone)]
pub struct ScopeMap {
    len: usize,
    spans: Vec<Span>,
    frames: Vec<Frame>,
}

impl ScopeMap {
    pub fn scan(text: &str, dialect: Dialect) -> Self {
        Scanner::new(text, dialect).run()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn kind_at(&self, offset: usize) -> SpanKind {
        let idx = self.spans.partition_point(|s| s.end <= offset);
        self.spans
            .get(idx)
            .map(|s| s.kind)
            .unwrap_or(SpanKind::Code)
    }

    /// True when every byte of `start..end` is code.
    pub fn is_code(&self, start: usize, end: usize) -> bool {
        if start >= end {
            return self.kind_at(start).is_code();
        }
        let first = self.spans.partition_point(|s| s.end <= start);
        self.spans[first..]
            .iter()
            .take_while(|s| s.start < end)
            .all(|s| s.kind.is_code())
    }

    /// Innermost bracket frame enclosing `offset`.
    ///
    /// The opening bracket itself belongs to the enclosing frame.
    pub fn frame_at(&self, offset: usize) -> Option<FrameKind> {
        let upto = self.frames.partition_point(|f| f.open < offset);
        self.frames[..upto]
            .iter()
            .rev()
            .find(|f| f.close >= offset && offset <= self.len)
            .map(|f| f.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok<'t> {
    Word(&'t str),
    Punct(u8),
    Value,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Code,
    Template,
    JsxTag { depth: u32, closing: bool },
    JsxText { depth: u32 },
}

#[derive(Debug, Clone, Copy)]
enum Open {
    Frame(usize),
    TemplateExpr,
    JsxExpr,
}

const CONTROL_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "with", "return", "typeof", "await", "yield", "new", "void",
    "delete", "throw", "in", "of", "instanceof", "case", "else", "do",
];

const REGEX_AFTER_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "yield", "await", "instanceof",
];

const DECL_MODIFIERS: &[&str] = &["export", "declare", "default"];

struct Scanner<'t> {
    text: &'t str,
    src: &'t [u8],
    dialect: Dialect,
    pos: usize,
    spans: Vec<Span>,
    frames: Vec<Frame>,
    modes: Vec<Mode>,
    opens: Vec<Open>,
    heads: Vec<Vec<Tok<'t>>>,
    last: Option<Tok<'t>>,
    last_closed_brace: Option<FrameKind>,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str, dialect: Dialect) -> Self {
        Self {
            text,
            src: text.as_bytes(),
            dialect,
            pos: 0,
            spans: Vec::new(),
            frames: Vec::new(),
            modes: vec![Mode::Code],
            opens: Vec::new(),
            heads: vec![Vec::new()],
            last: None,
            last_closed_brace: None,
        }
    }

    fn run(mut self) -> ScopeMap {
        while self.pos < self.src.len() {
            match self.modes.last().copied().unwrap_or(Mode::Code) {
                Mode::Code => self.step_code(),
                Mode::Template => self.step_template(),
                Mode::JsxTag { depth, closing } => self.step_jsx_tag(depth, closing),
                Mode::JsxText { depth } => self.step_jsx_text(depth),
            }
        }

        let len = self.src.len();
        for open in &self.opens {
            if let Open::Frame(idx) = *open {
                self.frames[idx].close = len;
            }
        }
        self.classify_parens();

        ScopeMap {
            len,
            spans: self.spans,
            frames: self.frames,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn mark(&mut self, kind: SpanKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        if let Some(prev) = self.spans.last_mut()
            && prev.kind == kind
            && prev.end == start
        {
            prev.end = end;
            return;
        }
        self.spans.push(Span { kind, start, end });
    }

    fn head(&mut self) -> &mut Vec<Tok<'t>> {
        if self.heads.is_empty() {
            self.heads.push(Vec::new());
        }
        let last = self.heads.len() - 1;
        &mut self.heads[last]
    }

    fn push_tok(&mut self, tok: Tok<'t>) {
        self.head().push(tok);
        self.last = Some(tok);
    }

    fn current_frame(&self) -> Option<usize> {
        self.opens.iter().rev().find_map(|o| match o {
            Open::Frame(idx) => Some(*idx),
            _ => None,
        })
    }

    fn step_code(&mut self) {
        let start = self.pos;
        let b = self.src[start];
        match b {
            b'/' if self.peek(1) == Some(b'/') => {
                let end = find_byte(self.src, start, b'\n').unwrap_or(self.src.len());
                self.mark(SpanKind::LineComment, start, end);
                self.pos = end;
            }
            b'/' if self.peek(1) == Some(b'*') => {
                let end = find_seq(self.src, start + 2, b"*/")
                    .map(|i| i + 2)
                    .unwrap_or(self.src.len());
                self.mark(SpanKind::BlockComment, start, end);
                self.pos = end;
            }
            b'/' if self.regex_allowed() => {
                let end = scan_regex(self.src, start);
                self.mark(SpanKind::RegexLit, start, end);
                self.pos = end;
                self.push_tok(Tok::Value);
            }
            b'\'' | b'"' => {
                let end = scan_string(self.src, start, b);
                self.mark(SpanKind::StringLit, start, end);
                self.pos = end;
                self.push_tok(Tok::Value);
            }
            b'`' => {
                self.mark(SpanKind::Template, start, start + 1);
                self.pos += 1;
                self.modes.push(Mode::Template);
            }
            b'<' if self.jsx_allowed() => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
                self.modes.push(Mode::JsxTag {
                    depth: 1,
                    closing: false,
                });
            }
            b'{' => {
                let kind = self.classify_brace();
                self.open_frame(kind, start);
            }
            b'(' => {
                let hint = self.paren_hint();
                let idx = self.open_frame(FrameKind::Parens, start);
                self.frames[idx].hint = hint;
            }
            b'[' => {
                self.open_frame(FrameKind::Brackets, start);
            }
            b'}' | b')' | b']' => self.close(b, start),
            b';' => {
                self.mark(SpanKind::Code, start, start + 1);
                self.pos += 1;
                self.head().clear();
                self.last = Some(Tok::Punct(b';'));
            }
            b'\n' => {
                self.mark(SpanKind::Code, start, start + 1);
                self.pos += 1;
                self.maybe_end_member();
            }
            b' ' | b'\t' | b'\r' => {
                self.mark(SpanKind::Code, start, start + 1);
                self.pos += 1;
            }
            b if is_ident_start(b) => {
                let mut end = start + 1;
                while end < self.src.len() && is_ident_continue(self.src[end]) {
                    end += 1;
                }
                self.mark(SpanKind::Code, start, end);
                self.pos = end;
                self.push_tok(Tok::Word(&self.text[start..end]));
            }
            b if b.is_ascii_digit() => {
                let mut end = start + 1;
                while end < self.src.len()
                    && (self.src[end].is_ascii_alphanumeric()
                        || self.src[end] == b'.'
                        || self.src[end] == b'_')
                {
                    end += 1;
                }
                self.mark(SpanKind::Code, start, end);
                self.pos = end;
                self.push_tok(Tok::Value);
            }
            _ => {
                self.mark(SpanKind::Code, start, start + 1);
                self.pos += 1;
                self.push_tok(Tok::Punct(b));
            }
        }
    }

    fn step_template(&mut self) {
        let start = self.pos;
        match self.src[start] {
            b'\\' => {
                let end = (start + 2).min(self.src.len());
                self.mark(SpanKind::Template, start, end);
                self.pos = end;
            }
            b'`' => {
                self.mark(SpanKind::Template, start, start + 1);
                self.pos += 1;
                self.modes.pop();
                self.push_tok(Tok::Value);
            }
            b'$' if self.peek(1) == Some(b'{') => {
                self.mark(SpanKind::Template, start, start + 2);
                self.pos += 2;
                self.opens.push(Open::TemplateExpr);
                self.heads.push(Vec::new());
                self.last = None;
                self.modes.push(Mode::Code);
            }
            _ => {
                self.mark(SpanKind::Template, start, start + 1);
                self.pos += 1;
            }
        }
    }

    fn step_jsx_tag(&mut self, depth: u32, closing: bool) {
        let start = self.pos;
        match self.src[start] {
            q @ (b'"' | b'\'') => {
                let end = scan_string(self.src, start, q);
                self.mark(SpanKind::StringLit, start, end);
                self.pos = end;
            }
            b'{' => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
                self.opens.push(Open::JsxExpr);
                self.heads.push(Vec::new());
                self.last = None;
                self.modes.push(Mode::Code);
            }
            b'/' if self.peek(1) == Some(b'>') => {
                self.mark(SpanKind::Markup, start, start + 2);
                self.pos += 2;
                self.leave_element(depth);
            }
            b'>' => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
                if closing {
                    self.leave_element(depth);
                } else {
                    self.replace_mode(Mode::JsxText { depth });
                }
            }
            _ => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
            }
        }
    }

    fn step_jsx_text(&mut self, depth: u32) {
        let start = self.pos;
        match self.src[start] {
            b'<' if self.peek(1) == Some(b'/') => {
                self.mark(SpanKind::Markup, start, start + 2);
                self.pos += 2;
                self.replace_mode(Mode::JsxTag {
                    depth,
                    closing: true,
                });
            }
            b'<' => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
                self.replace_mode(Mode::JsxTag {
                    depth: depth + 1,
                    closing: false,
                });
            }
            b'{' => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
                self.opens.push(Open::JsxExpr);
                self.heads.push(Vec::new());
                self.last = None;
                self.modes.push(Mode::Code);
            }
            _ => {
                self.mark(SpanKind::Markup, start, start + 1);
                self.pos += 1;
            }
        }
    }

    fn leave_element(&mut self, depth: u32) {
        if depth <= 1 {
            self.modes.pop();
            self.push_tok(Tok::Value);
        } else {
            self.replace_mode(Mode::JsxText { depth: depth - 1 });
        }
    }

    fn replace_mode(&mut self, mode: Mode) {
        if let Some(top) = self.modes.last_mut() {
            *top = mode;
        }
    }

    fn open_frame(&mut self, kind: FrameKind, at: usize) -> usize {
        self.mark(SpanKind::Code, at, at + 1);
        self.pos = at + 1;
        let idx = self.frames.len();
        self.frames.push(Frame {
            kind,
            open: at,
            close: usize::MAX,
            parent: self.current_frame(),
            hint: ParenHint::default(),
        });
        self.opens.push(Open::Frame(idx));
        self.heads.push(Vec::new());
        self.last = Some(Tok::Punct(self.src[at]));
        idx
    }

    fn close(&mut self, b: u8, at: usize) {
        self.pos = at + 1;

        if b == b'}' {
            match self.opens.last().copied() {
                Some(Open::TemplateExpr) => {
                    self.opens.pop();
                    self.heads.pop();
                    self.modes.pop();
                    self.mark(SpanKind::Template, at, at + 1);
                    return;
                }
                Some(Open::JsxExpr) => {
                    self.opens.pop();
                    self.heads.pop();
                    self.modes.pop();
                    self.mark(SpanKind::Markup, at, at + 1);
                    return;
                }
                _ => {}
            }
        }

        self.mark(SpanKind::Code, at, at + 1);

        // Find the matching opener without crossing a template/markup boundary.
        let mut target = None;
        for (depth, open) in self.opens.iter().enumerate().rev() {
            match open {
                Open::Frame(idx) => {
                    if closes(self.frames[*idx].kind, b) {
                        target = Some(depth);
                        break;
                    }
                }
                Open::TemplateExpr | Open::JsxExpr => break,
            }
        }
        let Some(target) = target else {
            self.push_tok(Tok::Punct(b));
            return;
        };

        let mut closed_kind = FrameKind::Block;
        while self.opens.len() > target {
            if let Some(Open::Frame(idx)) = self.opens.pop() {
                self.frames[idx].close = at;
                closed_kind = self.frames[idx].kind;
            }
            self.heads.pop();
        }

        if b == b'}' {
            self.last_closed_brace = Some(closed_kind);
            self.head().clear();
        }
        self.push_tok(Tok::Punct(b));
    }

    /// In declaration bodies a newline ends a member unless the line is clearly continued.
    fn maybe_end_member(&mut self) {
        let in_body = self
            .current_frame()
            .map(|idx| self.frames[idx].kind.is_declaration_body())
            .unwrap_or(false);
        if !in_body {
            return;
        }
        let ends_member = matches!(
            self.last,
            Some(Tok::Word(_))
                | Some(Tok::Value)
                | Some(Tok::Punct(b')'))
                | Some(Tok::Punct(b']'))
                | Some(Tok::Punct(b'}'))
                | Some(Tok::Punct(b'>'))
        );
        if ends_member {
            self.head().clear();
        }
    }

    fn classify_brace(&mut self) -> FrameKind {
        let enclosing = self.current_frame().map(|idx| self.frames[idx].kind);
        let last_closed = self.last_closed_brace;
        let head = self.head().clone();

        let words: Vec<&str> = head
            .iter()
            .filter_map(|t| match t {
                Tok::Word(w) => Some(*w),
                _ => None,
            })
            .collect();

        if words.iter().any(|w| *w == "interface" || *w == "enum") {
            return FrameKind::TypeBody;
        }
        if words.contains(&"class") {
            return FrameKind::ClassBody;
        }
        let first = words.iter().find(|w| !DECL_MODIFIERS.contains(w));
        if first == Some(&"type") && head.contains(&Tok::Punct(b'=')) {
            return FrameKind::TypeBody;
        }

        let ends_with_colon = head.last() == Some(&Tok::Punct(b':'));
        match enclosing {
            Some(FrameKind::TypeBody) => return FrameKind::TypeBody,
            Some(FrameKind::ClassBody | FrameKind::Parens | FrameKind::ParamList)
                if ends_with_colon =>
            {
                return FrameKind::TypeBody;
            }
            _ => {}
        }

        if let [Tok::Punct(b'}'), Tok::Punct(b'&' | b'|')] = head.as_slice()
            && last_closed == Some(FrameKind::TypeBody)
        {
            return FrameKind::TypeBody;
        }

        FrameKind::Block
    }

    fn paren_hint(&mut self) -> ParenHint {
        let head = self.head().clone();
        let last = head.last().copied();
        ParenHint {
            after_function: head.contains(&Tok::Word("function")),
            after_word: match last {
                Some(Tok::Word(w)) => !CONTROL_WORDS.contains(&w),
                Some(Tok::Punct(b'>')) => true,
                _ => false,
            },
            after_control: matches!(last, Some(Tok::Word(w)) if CONTROL_WORDS.contains(&w)),
            after_catch: last == Some(Tok::Word("catch")),
            has_assign: head.contains(&Tok::Punct(b'=')),
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.last {
            None => true,
            Some(Tok::Value) => false,
            Some(Tok::Word(w)) => REGEX_AFTER_WORDS.contains(&w),
            Some(Tok::Punct(p)) => !matches!(p, b')' | b']' | b'}'),
        }
    }

    fn jsx_allowed(&self) -> bool {
        if self.dialect != Dialect::Markup {
            return false;
        }
        let next_ok = matches!(self.peek(1), Some(b) if b.is_ascii_alphabetic() || b == b'>');
        if !next_ok {
            return false;
        }
        match self.last {
            None => true,
            Some(Tok::Value) => false,
            Some(Tok::Word(w)) => matches!(w, "return" | "yield" | "default" | "await"),
            Some(Tok::Punct(p)) => matches!(
                p,
                b'(' | b',' | b'=' | b':' | b'?' | b'{' | b'}' | b'[' | b';' | b'&' | b'|'
                    | b'!' | b'>'
            ),
        }
    }

    fn classify_parens(&mut self) {
        for idx in 0..self.frames.len() {
            let frame = self.frames[idx];
            if frame.kind != FrameKind::Parens {
                continue;
            }
            let hint = frame.hint;
            if hint.after_control && !hint.after_catch {
                continue;
            }

            let parent_kind = frame.parent.map(|p| self.frames[p].kind);
            let follow = self.next_code_bytes(frame.close.saturating_add(1), 2);

            let is_params = follow.starts_with(b"=>")
                || hint.after_function
                || hint.after_catch
                || (matches!(parent_kind, Some(k) if k.is_declaration_body())
                    && !hint.has_assign)
                || (hint.after_word && matches!(follow.first(), Some(b'{') | Some(b':')));

            if is_params {
                self.frames[idx].kind = FrameKind::ParamList;
            }
        }
    }

    /// The next `n` code bytes at or after `from`, skipping whitespace and literals.
    fn next_code_bytes(&self, from: usize, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        let mut i = from;
        let first_span = self.spans.partition_point(|s| s.end <= from);
        for span in &self.spans[first_span..] {
            if !span.kind.is_code() {
                if !out.is_empty() {
                    break;
                }
                continue;
            }
            i = i.max(span.start);
            while i < span.end {
                let b = self.src[i];
                if out.is_empty() && b.is_ascii_whitespace() {
                    i += 1;
                    continue;
                }
                out.push(b);
                if out.len() == n {
                    return out;
                }
                i += 1;
            }
        }
        out
    }
}

fn closes(kind: FrameKind, b: u8) -> bool {
    match b {
        b'}' => matches!(
            kind,
            FrameKind::TypeBody | FrameKind::ClassBody | FrameKind::Block
        ),
        b')' => matches!(kind, FrameKind::Parens | FrameKind::ParamList),
        b']' => kind == FrameKind::Brackets,
        _ => false,
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn find_byte(src: &[u8], from: usize, needle: u8) -> Option<usize> {
    src[from..].iter().position(|b| *b == needle).map(|i| from + i)
}

fn find_seq(src: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > src.len() {
        return None;
    }
    src[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

/// End (exclusive) of a quoted string starting at `start`. Unterminated strings stop at the newline.
fn scan_string(src: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    src.len()
}

fn scan_regex(src: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < src.len() && src[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return i;
            }
            _ => i += 1,
        }
    }
    src.len().min(i)
}
