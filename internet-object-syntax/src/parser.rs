//! Token stream to document tree. Recursive descent, left to right; a
//! syntactic failure becomes an [`ErrorNode`] attached to the container
//! being built, the parser resynchronises on `,`, the matching close
//! bracket or `---`, and the surrounding parse continues.

use internet_object_core::{ErrorCode, ErrorInfo, PositionRange};

use crate::ast::{
    ArrayNode, CollectionNode, DocumentNode, ErrorNode, HeaderNode, MemberNode, Node, ObjectNode,
    SectionContentNode, SectionNode,
};
use crate::token::{Token, TokenType};

/// Parses a token stream into a document tree. Never fails: everything
/// unparseable is represented by error nodes, mirrored into
/// [`DocumentNode::errors`].
pub fn parse_tokens(tokens: &[Token]) -> DocumentNode {
    Parser {
        tokens,
        index: 0,
        errors: Vec::new(),
    }
    .parse_document()
}

struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
    errors: Vec<ErrorInfo>,
}

impl<'a> Parser<'a> {
    fn parse_document(mut self) -> DocumentNode {
        let has_separator = self
            .tokens
            .iter()
            .any(|t| t.token_type == TokenType::SectionSep);

        let header = if has_separator {
            self.parse_header()
        } else {
            None
        };

        let mut sections = Vec::new();
        if !has_separator {
            if !self.at_end() {
                sections.push(self.parse_section(None, None));
            }
        } else {
            while let Some(token) = self.peek() {
                if token.token_type != TokenType::SectionSep {
                    let error = self.unexpected(token);
                    self.errors.push(error);
                    self.recover_to(&[TokenType::SectionSep]);
                    continue;
                }
                self.bump();
                let name = self
                    .eat(TokenType::SectionName)
                    .and_then(|t| t.text().map(str::to_string));
                let schema_ref = self
                    .eat(TokenType::SectionSchema)
                    .and_then(|t| t.text().map(str::to_string));
                sections.push(self.parse_section(name, schema_ref));
            }
        }

        DocumentNode {
            header,
            sections,
            errors: self.errors,
        }
    }

    /// The content before the first `---`: definition rows when it leads
    /// with `~`, otherwise a bare schema object. Nothing at all means no
    /// header.
    fn parse_header(&mut self) -> Option<HeaderNode> {
        if self.at(TokenType::SectionSep) || self.at_end() {
            return None;
        }
        if self.at(TokenType::CollectionStart) {
            let mut members = Vec::new();
            while self.at(TokenType::CollectionStart) {
                self.bump();
                loop {
                    if self.at_end()
                        || self.at(TokenType::CollectionStart)
                        || self.at(TokenType::SectionSep)
                    {
                        break;
                    }
                    let member = self.parse_member(&[
                        TokenType::CollectionStart,
                        TokenType::SectionSep,
                    ]);
                    members.push(member);
                    if self.at(TokenType::Comma) {
                        self.bump();
                        continue;
                    }
                    break;
                }
            }
            return Some(HeaderNode::Definitions(members));
        }
        let object = self.parse_object_until(&[TokenType::SectionSep]);
        Some(HeaderNode::Schema(object))
    }

    fn parse_section(
        &mut self,
        name: Option<String>,
        schema_ref: Option<String>,
    ) -> SectionNode {
        let start = self.current_range();
        let content = if self.at_end() || self.at(TokenType::SectionSep) {
            None
        } else if self.at(TokenType::CollectionStart) {
            Some(SectionContentNode::Collection(self.parse_collection()))
        } else {
            Some(SectionContentNode::Object(
                self.parse_object_until(&[TokenType::SectionSep]),
            ))
        };
        SectionNode {
            name,
            schema_ref,
            content,
            range: start.span_to(&self.previous_range()),
        }
    }

    fn parse_collection(&mut self) -> CollectionNode {
        let start = self.current_range();
        let mut rows = Vec::new();
        while self.at(TokenType::CollectionStart) {
            self.bump();
            let row = self.parse_object_until(&[
                TokenType::CollectionStart,
                TokenType::SectionSep,
            ]);
            rows.push(Node::Object(row));
        }
        CollectionNode {
            rows,
            range: start.span_to(&self.previous_range()),
        }
    }

    /// A braceless member list running until one of `stops` (or the end).
    fn parse_object_until(&mut self, stops: &[TokenType]) -> ObjectNode {
        let start = self.current_range();
        let mut members = Vec::new();
        loop {
            if self.at_end() || self.at_any(stops) {
                break;
            }
            // A comma with no member before it is an elided positional slot.
            if self.at(TokenType::Comma) {
                members.push(MemberNode {
                    key: None,
                    value: None,
                    range: self.current_range(),
                });
                self.bump();
                continue;
            }
            let member = self.parse_member(stops);
            members.push(member);
            if self.at(TokenType::Comma) {
                self.bump();
                continue;
            }
            if self.at_end() || self.at_any(stops) {
                break;
            }
            // Something other than a separator after a member.
            let error = self.peek().map(|t| self.unexpected(t));
            if let Some(error) = error {
                self.errors.push(error.clone());
                members.push(MemberNode {
                    key: None,
                    value: Some(Node::Error(ErrorNode {
                        range: error.position.unwrap_or_default(),
                        error,
                    })),
                    range: self.current_range(),
                });
            }
            let mut resync = stops.to_vec();
            resync.push(TokenType::Comma);
            self.recover_to(&resync);
            if self.at(TokenType::Comma) {
                self.bump();
            }
        }
        ObjectNode {
            members,
            range: start.span_to(&self.previous_range()),
        }
    }

    fn parse_member(&mut self, stops: &[TokenType]) -> MemberNode {
        let start = self.current_range();
        let keyed = self.peek().map(|t| t.is_value()).unwrap_or(false)
            && self
                .peek_at(1)
                .map(|t| t.token_type == TokenType::Colon)
                .unwrap_or(false);
        let mut key = None;
        if keyed {
            let key_token = self.bump().expect("peeked").clone();
            self.bump(); // the colon
            if !key_token.is_string() {
                let error = ErrorInfo::new(
                    ErrorCode::InvalidKey,
                    format!("\"{}\" cannot be used as a member key", key_token.raw),
                )
                .with_position(key_token.range);
                self.errors.push(error.clone());
                // Consume the value so the list stays in step, then stand
                // the whole member in as an error.
                if !(self.at_end() || self.at_any(stops) || self.at(TokenType::Comma)) {
                    let _ = self.parse_value(stops);
                }
                return MemberNode {
                    key: None,
                    value: Some(Node::Error(ErrorNode {
                        range: key_token.range,
                        error,
                    })),
                    range: start.span_to(&self.previous_range()),
                };
            }
            key = Some(key_token);
        }
        let value = if self.at_end() || self.at_any(stops) || self.at(TokenType::Comma) {
            None
        } else {
            Some(self.parse_value(stops))
        };
        MemberNode {
            key,
            value,
            range: start.span_to(&self.previous_range()),
        }
    }

    fn parse_value(&mut self, stops: &[TokenType]) -> Node {
        let Some(token) = self.peek() else {
            return Node::Error(ErrorNode {
                error: ErrorInfo::new(ErrorCode::UnexpectedToken, "unexpected end of input"),
                range: self.previous_range(),
            });
        };
        match token.token_type {
            TokenType::CurlyOpen => self.parse_braced_object(),
            TokenType::BracketOpen => self.parse_array(),
            TokenType::Error => {
                let token = self.bump().expect("peeked").clone();
                let error = token.error.clone().unwrap_or_else(|| {
                    ErrorInfo::new(ErrorCode::UnexpectedToken, "malformed token")
                        .with_position(token.range)
                });
                self.errors.push(error.clone());
                Node::Error(ErrorNode {
                    error,
                    range: token.range,
                })
            }
            _ if token.is_value() => {
                let token = self.bump().expect("peeked").clone();
                Node::Token(token)
            }
            _ => {
                let range = token.range;
                let error = self.unexpected(token);
                self.errors.push(error.clone());
                self.bump();
                let mut resync = stops.to_vec();
                resync.push(TokenType::Comma);
                self.recover_to(&resync);
                Node::Error(ErrorNode { error, range })
            }
        }
    }

    fn parse_braced_object(&mut self) -> Node {
        let open = self.bump().expect("peeked at CurlyOpen").clone();
        let mut object =
            self.parse_object_until(&[TokenType::CurlyClose, TokenType::SectionSep]);
        if self.at(TokenType::CurlyClose) {
            let close = self.bump().expect("peeked").clone();
            object.range = open.range.span_to(&close.range);
            return Node::Object(object);
        }
        // Synthetic close: report against the opener and keep the object.
        let error = ErrorInfo::new(
            ErrorCode::ExpectingBracket,
            "expecting \"}\" for the object opened here",
        )
        .with_position(open.range);
        self.errors.push(error.clone());
        object.range = open.range.span_to(&self.previous_range());
        object.members.push(MemberNode {
            key: None,
            value: Some(Node::Error(ErrorNode {
                range: open.range,
                error,
            })),
            range: open.range,
        });
        Node::Object(object)
    }

    fn parse_array(&mut self) -> Node {
        let open = self.bump().expect("peeked at BracketOpen").clone();
        let mut elements = Vec::new();
        loop {
            if self.at(TokenType::BracketClose) {
                let close = self.bump().expect("peeked").clone();
                return Node::Array(ArrayNode {
                    elements,
                    range: open.range.span_to(&close.range),
                });
            }
            if self.at_end() || self.at(TokenType::SectionSep) {
                let error = ErrorInfo::new(
                    ErrorCode::ExpectingBracket,
                    "expecting \"]\" for the array opened here",
                )
                .with_position(open.range);
                self.errors.push(error.clone());
                elements.push(Node::Error(ErrorNode {
                    range: open.range,
                    error,
                }));
                return Node::Array(ArrayNode {
                    elements,
                    range: open.range.span_to(&self.previous_range()),
                });
            }
            if self.at(TokenType::Comma) {
                // An elided array element has no meaning.
                let token = self.bump().expect("peeked").clone();
                let error = ErrorInfo::new(
                    ErrorCode::UnexpectedToken,
                    "arrays cannot contain empty elements",
                )
                .with_position(token.range);
                self.errors.push(error.clone());
                elements.push(Node::Error(ErrorNode {
                    error,
                    range: token.range,
                }));
                continue;
            }
            elements.push(self.parse_value(&[
                TokenType::BracketClose,
                TokenType::Comma,
                TokenType::SectionSep,
            ]));
            if self.at(TokenType::Comma) {
                self.bump();
            }
        }
    }

    // Cursor plumbing.

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.index + ahead)
    }

    fn at(&self, token_type: TokenType) -> bool {
        self.peek().map(|t| t.token_type == token_type).unwrap_or(false)
    }

    fn at_any(&self, stops: &[TokenType]) -> bool {
        self.peek()
            .map(|t| stops.contains(&t.token_type))
            .unwrap_or(false)
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    fn eat(&mut self, token_type: TokenType) -> Option<&Token> {
        if self.at(token_type) {
            self.bump()
        } else {
            None
        }
    }

    fn current_range(&self) -> PositionRange {
        self.peek()
            .map(|t| t.range)
            .unwrap_or_else(|| self.previous_range())
    }

    fn previous_range(&self) -> PositionRange {
        self.index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.range)
            .unwrap_or_default()
    }

    fn unexpected(&self, token: &Token) -> ErrorInfo {
        ErrorInfo::new(
            ErrorCode::UnexpectedToken,
            format!("unexpected \"{}\"", token.raw),
        )
        .with_position(token.range)
    }

    /// Skips ahead to the next token in `stops` at the current bracket
    /// depth, or the end of input.
    fn recover_to(&mut self, stops: &[TokenType]) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.token_type {
                TokenType::CurlyOpen | TokenType::BracketOpen => depth += 1,
                TokenType::CurlyClose | TokenType::BracketClose if depth > 0 => depth -= 1,
                t if depth == 0 && stops.contains(&t) => return,
                TokenType::SectionSep => return,
                _ => {}
            }
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests;
