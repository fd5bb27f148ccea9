use std::slice;

use super::document::{Block, Cell, Document, Paragraph, Row, Table};

/// One step of a depth-first walk. Table structure is bracketed so a consumer
/// can tell which cell a paragraph belongs to without holding a cursor.
#[derive(Debug, Clone, Copy)]
pub enum WalkEvent<'a> {
    Paragraph(&'a Paragraph),
    TableStart(&'a Table),
    RowStart,
    CellStart,
    CellEnd,
    RowEnd,
    TableEnd,
}

enum Frame<'a> {
    Blocks(slice::Iter<'a, Block>),
    Rows(slice::Iter<'a, Row>),
    Cells(slice::Iter<'a, Cell>),
}

enum Step<'a> {
    Block(Option<&'a Block>),
    Row(Option<&'a Row>),
    Cell(Option<&'a Cell>),
}

pub struct BlockWalker<'a> {
    frames: Vec<Frame<'a>>,
}

pub fn walk(document: &Document) -> BlockWalker<'_> {
    BlockWalker::over(&document.blocks)
}

impl<'a> BlockWalker<'a> {
    pub fn over(blocks: &'a [Block]) -> Self {
        Self {
            frames: vec![Frame::Blocks(blocks.iter())],
        }
    }

    pub fn blocks(self) -> Blocks<'a> {
        Blocks {
            walker: self,
            depth: 0,
        }
    }
}

impl<'a> Iterator for BlockWalker<'a> {
    type Item = WalkEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.frames.last_mut()? {
                Frame::Blocks(iter) => Step::Block(iter.next()),
                Frame::Rows(iter) => Step::Row(iter.next()),
                Frame::Cells(iter) => Step::Cell(iter.next()),
            };

            match step {
                Step::Block(Some(Block::Paragraph(paragraph))) => {
                    return Some(WalkEvent::Paragraph(paragraph));
                }
                Step::Block(Some(Block::Table(table))) => {
                    self.frames.push(Frame::Rows(table.rows.iter()));
                    return Some(WalkEvent::TableStart(table));
                }
                Step::Block(None) => {
                    self.frames.pop();
                    if matches!(self.frames.last(), Some(Frame::Cells(_))) {
                        return Some(WalkEvent::CellEnd);
                    }
                }
                Step::Row(Some(row)) => {
                    self.frames.push(Frame::Cells(row.cells.iter()));
                    return Some(WalkEvent::RowStart);
                }
                Step::Row(None) => {
                    self.frames.pop();
                    return Some(WalkEvent::TableEnd);
                }
                Step::Cell(Some(cell)) => {
                    self.frames.push(Frame::Blocks(cell.blocks.iter()));
                    return Some(WalkEvent::CellStart);
                }
                Step::Cell(None) => {
                    self.frames.pop();
                    return Some(WalkEvent::RowEnd);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BlockRef<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
}

#[derive(Debug, Clone, Copy)]
pub struct BlockVisit<'a> {
    pub block: BlockRef<'a>,
    /// Number of enclosing tables.
    pub depth: usize,
}

/// Flattens the event stream into blocks in document order, tables before
/// the blocks of their cells.
pub struct Blocks<'a> {
    walker: BlockWalker<'a>,
    depth: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = BlockVisit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walker.next()? {
                WalkEvent::Paragraph(paragraph) => {
                    return Some(BlockVisit {
                        block: BlockRef::Paragraph(paragraph),
                        depth: self.depth,
                    });
                }
                WalkEvent::TableStart(table) => {
                    let visit = BlockVisit {
                        block: BlockRef::Table(table),
                        depth: self.depth,
                    };
                    self.depth += 1;
                    return Some(visit);
                }
                WalkEvent::TableEnd => self.depth = self.depth.saturating_sub(1),
                WalkEvent::RowStart
                | WalkEvent::CellStart
                | WalkEvent::CellEnd
                | WalkEvent::RowEnd => {}
            }
        }
    }
}
