//! Immutable graph edits: `definition.apply_edit(edit) -> new definition`.
//!
//! Edits enforce referential integrity and port names at the point of change,
//! so a graph built only through edits never holds a dangling connection. The
//! validator still checks integrity because persisted data can be edited
//! out-of-band.

use super::{
    BlockId, BlockParams, Connection, Endpoint, Note, NoteId, Position, StrategyDefinition,
};

/// Errors that reject an edit. The original definition is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("block id already in use: {0}")]
    DuplicateBlockId(BlockId),
    #[error("no block with id {0}")]
    UnknownBlock(BlockId),
    #[error("block {block_id} has no output port '{port}'")]
    UnknownOutputPort { block_id: BlockId, port: String },
    #[error("block {block_id} has no input port '{port}'")]
    UnknownInputPort { block_id: BlockId, port: String },
    #[error("block {block_id} is a {existing}; changing it to {requested} requires a new block")]
    TypeChange {
        block_id: BlockId,
        existing: String,
        requested: String,
    },
    #[error("connection already exists: {0:?}")]
    DuplicateConnection(Box<Connection>),
    #[error("no such connection: {0:?}")]
    UnknownConnection(Box<Connection>),
    #[error("note id already in use: {0}")]
    DuplicateNoteId(NoteId),
    #[error("no note with id {0}")]
    UnknownNote(NoteId),
}

/// A single user edit on the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEdit {
    AddBlock {
        id: BlockId,
        params: BlockParams,
        position: Position,
    },
    /// Removes the block and every connection touching it; anchored notes are detached.
    RemoveBlock(BlockId),
    MoveBlock {
        id: BlockId,
        position: Position,
    },
    RenameBlock {
        id: BlockId,
        label: String,
    },
    /// Replaces parameter values. The variant must match the block's type.
    UpdateParams {
        id: BlockId,
        params: BlockParams,
    },
    Connect(Connection),
    Disconnect(Connection),
    AddNote(Note),
    UpdateNote {
        id: NoteId,
        text: String,
    },
    MoveNote {
        id: NoteId,
        position: Position,
    },
    AnchorNote {
        id: NoteId,
        anchor: Option<BlockId>,
    },
    RemoveNote(NoteId),
}

impl StrategyDefinition {
    /// Apply one edit, returning the next snapshot.
    pub fn apply_edit(&self, edit: GraphEdit) -> Result<StrategyDefinition, EditError> {
        let mut next = self.clone();
        match edit {
            GraphEdit::AddBlock {
                id,
                params,
                position,
            } => {
                if next.contains_block(&id) {
                    return Err(EditError::DuplicateBlockId(id));
                }
                next.blocks.push(super::Block::new(id, params, position));
            }
            GraphEdit::RemoveBlock(id) => {
                if !next.contains_block(&id) {
                    return Err(EditError::UnknownBlock(id));
                }
                next.blocks.retain(|b| b.id != id);
                next.connections
                    .retain(|c| c.from.block_id != id && c.to.block_id != id);
                for note in next.notes.iter_mut() {
                    if note.anchor.as_ref() == Some(&id) {
                        note.anchor = None;
                    }
                }
            }
            GraphEdit::MoveBlock { id, position } => {
                next.block_mut(&id)?.position = position;
            }
            GraphEdit::RenameBlock { id, label } => {
                next.block_mut(&id)?.label = label;
            }
            GraphEdit::UpdateParams { id, params } => {
                let block = next.block_mut(&id)?;
                if block.type_name() != params.type_name() {
                    return Err(EditError::TypeChange {
                        block_id: id,
                        existing: block.type_name().to_string(),
                        requested: params.type_name().to_string(),
                    });
                }
                block.params = params;
            }
            GraphEdit::Connect(connection) => {
                next.check_output(&connection.from)?;
                next.check_input(&connection.to)?;
                if next.connections.contains(&connection) {
                    return Err(EditError::DuplicateConnection(Box::new(connection)));
                }
                next.connections.push(connection);
            }
            GraphEdit::Disconnect(connection) => {
                let before = next.connections.len();
                next.connections.retain(|c| c != &connection);
                if next.connections.len() == before {
                    return Err(EditError::UnknownConnection(Box::new(connection)));
                }
            }
            GraphEdit::AddNote(note) => {
                if next.notes.iter().any(|n| n.id == note.id) {
                    return Err(EditError::DuplicateNoteId(note.id));
                }
                if let Some(anchor) = &note.anchor {
                    if !next.contains_block(anchor) {
                        return Err(EditError::UnknownBlock(anchor.clone()));
                    }
                }
                next.notes.push(note);
            }
            GraphEdit::UpdateNote { id, text } => {
                next.note_mut(&id)?.text = text;
            }
            GraphEdit::MoveNote { id, position } => {
                next.note_mut(&id)?.position = position;
            }
            GraphEdit::AnchorNote { id, anchor } => {
                if let Some(anchor) = &anchor {
                    if !next.contains_block(anchor) {
                        return Err(EditError::UnknownBlock(anchor.clone()));
                    }
                }
                next.note_mut(&id)?.anchor = anchor;
            }
            GraphEdit::RemoveNote(id) => {
                let before = next.notes.len();
                next.notes.retain(|n| n.id != id);
                if next.notes.len() == before {
                    return Err(EditError::UnknownNote(id));
                }
            }
        }
        Ok(next)
    }

    /// Apply a batch of edits atomically: either all succeed or none apply.
    pub fn apply_edits(
        &self,
        edits: impl IntoIterator<Item = GraphEdit>,
    ) -> Result<StrategyDefinition, EditError> {
        edits
            .into_iter()
            .try_fold(self.clone(), |def, edit| def.apply_edit(edit))
    }

    fn block_mut(&mut self, id: &BlockId) -> Result<&mut super::Block, EditError> {
        self.blocks
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| EditError::UnknownBlock(id.clone()))
    }

    fn note_mut(&mut self, id: &NoteId) -> Result<&mut Note, EditError> {
        self.notes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| EditError::UnknownNote(id.clone()))
    }

    // Unknown blocks have no declared ports; any port name is accepted so that
    // connections to blocks from newer builds are not rejected.
    fn check_output(&self, end: &Endpoint) -> Result<(), EditError> {
        let block = self
            .block(&end.block_id)
            .ok_or_else(|| EditError::UnknownBlock(end.block_id.clone()))?;
        match block.meta() {
            Some(meta) if meta.output(&end.port).is_none() => Err(EditError::UnknownOutputPort {
                block_id: end.block_id.clone(),
                port: end.port.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn check_input(&self, end: &Endpoint) -> Result<(), EditError> {
        let block = self
            .block(&end.block_id)
            .ok_or_else(|| EditError::UnknownBlock(end.block_id.clone()))?;
        match block.meta() {
            Some(meta) if meta.input(&end.port).is_none() => Err(EditError::UnknownInputPort {
                block_id: end.block_id.clone(),
                port: end.port.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::params::{PeriodParams, PriceParams, StopLossParams};

    fn add(id: &str, params: BlockParams) -> GraphEdit {
        GraphEdit::AddBlock {
            id: id.into(),
            params,
            position: Position::default(),
        }
    }

    fn wire(from: &str, out: &str, to: &str, input: &str) -> Connection {
        Connection::new(Endpoint::new(from, out), Endpoint::new(to, input))
    }

    fn price_into_sma() -> StrategyDefinition {
        StrategyDefinition::empty()
            .apply_edits([
                add("p", BlockParams::Price(PriceParams::default())),
                add("s", BlockParams::Sma(PeriodParams { period: 10 })),
                GraphEdit::Connect(wire("p", "price", "s", "price")),
            ])
            .unwrap()
    }

    #[test]
    fn edits_do_not_mutate_the_source_snapshot() {
        let before = price_into_sma();
        let after = before
            .apply_edit(GraphEdit::MoveBlock {
                id: "s".into(),
                position: Position::new(10.0, 20.0),
            })
            .unwrap();
        assert_eq!(before.block(&"s".into()).unwrap().position, Position::default());
        assert_eq!(after.block(&"s".into()).unwrap().position, Position::new(10.0, 20.0));
    }

    #[test]
    fn duplicate_block_id_rejected() {
        let def = price_into_sma();
        let err = def.apply_edit(add("p", BlockParams::Volume)).unwrap_err();
        assert_eq!(err, EditError::DuplicateBlockId("p".into()));
    }

    #[test]
    fn connect_checks_ports() {
        let def = price_into_sma();
        let err = def
            .apply_edit(GraphEdit::Connect(wire("p", "volume", "s", "price")))
            .unwrap_err();
        assert!(matches!(err, EditError::UnknownOutputPort { .. }));

        let err = def
            .apply_edit(GraphEdit::Connect(wire("p", "price", "s", "left")))
            .unwrap_err();
        assert!(matches!(err, EditError::UnknownInputPort { .. }));

        let err = def
            .apply_edit(GraphEdit::Connect(wire("ghost", "price", "s", "price")))
            .unwrap_err();
        assert_eq!(err, EditError::UnknownBlock("ghost".into()));
    }

    #[test]
    fn duplicate_connection_rejected() {
        let def = price_into_sma();
        let err = def
            .apply_edit(GraphEdit::Connect(wire("p", "price", "s", "price")))
            .unwrap_err();
        assert!(matches!(err, EditError::DuplicateConnection(_)));
    }

    #[test]
    fn remove_block_cascades_connections_and_detaches_notes() {
        let def = price_into_sma()
            .apply_edit(GraphEdit::AddNote(Note {
                id: "n1".into(),
                text: "fast average".into(),
                position: Position::new(5.0, 5.0),
                anchor: Some("s".into()),
            }))
            .unwrap();

        let after = def.apply_edit(GraphEdit::RemoveBlock("s".into())).unwrap();
        assert!(after.block(&"s".into()).is_none());
        assert!(after.connections.is_empty());
        assert_eq!(after.notes.len(), 1);
        assert_eq!(after.notes[0].text, "fast average");
        assert_eq!(after.notes[0].anchor, None);
    }

    #[test]
    fn type_change_rejected() {
        let def = price_into_sma();
        let err = def
            .apply_edit(GraphEdit::UpdateParams {
                id: "s".into(),
                params: BlockParams::Ema(PeriodParams { period: 10 }),
            })
            .unwrap_err();
        assert!(matches!(err, EditError::TypeChange { .. }));

        let ok = def
            .apply_edit(GraphEdit::UpdateParams {
                id: "s".into(),
                params: BlockParams::Sma(PeriodParams { period: 50 }),
            })
            .unwrap();
        assert_eq!(
            ok.block(&"s".into()).unwrap().params,
            BlockParams::Sma(PeriodParams { period: 50 })
        );
    }

    #[test]
    fn batch_is_atomic() {
        let def = price_into_sma();
        let result = def.apply_edits([
            add("sl", BlockParams::StopLoss(StopLossParams::default())),
            GraphEdit::RemoveBlock("missing".into()),
        ]);
        assert!(result.is_err());
        assert!(def.block(&"sl".into()).is_none());
    }

    #[test]
    fn anchor_note_requires_existing_block() {
        let def = price_into_sma()
            .apply_edit(GraphEdit::AddNote(Note {
                id: "n".into(),
                text: String::new(),
                position: Position::default(),
                anchor: None,
            }))
            .unwrap();
        let err = def
            .apply_edit(GraphEdit::AnchorNote {
                id: "n".into(),
                anchor: Some("ghost".into()),
            })
            .unwrap_err();
        assert_eq!(err, EditError::UnknownBlock("ghost".into()));
    }
}
