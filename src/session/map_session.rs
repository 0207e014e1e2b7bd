use std::net::SocketAddr;
use std::sync::Arc;

use crate::assets::store::{AssetStore, campaign_relative_path};
use crate::foundation::core::{Color, ItemId, Point, Vec2};
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::interact::edits::{ItemEdit, apply_edit};
use crate::interact::machine::{InputOutcome, Interaction, PointerButton, Redraw, Tool, ToolSettings};
use crate::interact::selection::Modifiers;
use crate::persist::pipeline::{PersistJob, PersistPipeline, PersistStats};
use crate::persist::repository::ItemRepository;
use crate::render::frame::{ComposedFrame, Decorations, PopupCard};
use crate::scene::catalog::{EntityCatalog, hover_text};
use crate::scene::item::{DEFAULT_HP, DEFAULT_TEXT_SIZE, ItemKind, SceneItem, TextAnnotation, Token};
use crate::session::config::SessionOpts;
use crate::session::document::{DocumentSnapshot, MapDocument};
use crate::sink::{FrameSink, InteractiveSurface, MirrorSink, SnapshotCell, StreamServer};

const POPUP_GAP: f64 = 8.0;

/// One input event from the GM surface, in screen pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// Button pressed.
    PointerDown {
        /// Pointer position.
        pos: Point,
        /// Button.
        button: PointerButton,
        /// Held modifiers.
        mods: Modifiers,
    },
    /// Pointer moved.
    PointerMove {
        /// Pointer position.
        pos: Point,
    },
    /// Button released.
    PointerUp {
        /// Pointer position.
        pos: Point,
    },
    /// Pointer left the surface.
    PointerLeave,
    /// Double click.
    DoubleClick {
        /// Pointer position.
        pos: Point,
    },
    /// Wheel notches; positive zooms in.
    Wheel {
        /// Pointer position.
        pos: Point,
        /// Notch count.
        notches: i32,
    },
    /// Delete the selection.
    Delete,
    /// Copy the selection.
    Copy,
    /// Paste at the pointer.
    Paste,
    /// Undo the last fog edit.
    UndoFog,
    /// Raise the selection.
    BringToFront,
    /// Lower the selection.
    SendToBack,
    /// Move the selection by a world delta.
    Nudge(Vec2),
    /// Switch tools.
    SetTool(Tool),
    /// Show handles on a shape.
    EditShape(ItemId),
}

/// A GM session: the open map, its input state machine and every render sink.
///
/// Lives on the input thread. The stream server and the persistence worker only see snapshots.
pub struct MapSession {
    opts: SessionOpts,
    assets: Arc<AssetStore>,
    repo: Arc<dyn ItemRepository>,
    catalog: Arc<dyn EntityCatalog>,
    doc: Option<MapDocument>,
    interaction: Interaction,
    surface: InteractiveSurface,
    mirror: Option<MirrorSink>,
    cell: SnapshotCell,
    stream: Option<StreamServer>,
    pipeline: PersistPipeline,
}

impl MapSession {
    /// Session over a campaign directory. No map is open yet.
    pub fn new(
        opts: SessionOpts,
        repo: Arc<dyn ItemRepository>,
        catalog: Arc<dyn EntityCatalog>,
    ) -> FogmapResult<Self> {
        let opts = opts.validated()?;
        let assets = match &opts.editor.font_path {
            None => AssetStore::new(&opts.campaign_dir),
            Some(font) => AssetStore::new(&opts.campaign_dir)
                .with_font_file(font)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "label font unavailable; text is skipped");
                    AssetStore::new(&opts.campaign_dir)
                }),
        };
        let assets = Arc::new(assets);
        let pipeline = PersistPipeline::new(Arc::clone(&repo), &opts.persist)?;
        Ok(Self {
            interaction: Interaction::new(ToolSettings::from(&opts.editor)),
            surface: InteractiveSurface::new(Arc::clone(&assets)),
            mirror: None,
            cell: SnapshotCell::default(),
            stream: None,
            doc: None,
            pipeline,
            opts,
            assets,
            repo,
            catalog,
        })
    }

    /// Options in effect.
    pub fn opts(&self) -> &SessionOpts {
        &self.opts
    }

    /// Asset store shared by all renderers.
    pub fn assets(&self) -> &Arc<AssetStore> {
        &self.assets
    }

    /// Names of stored maps.
    pub fn map_names(&self) -> FogmapResult<Vec<String>> {
        Ok(self
            .repo
            .load_items()?
            .into_iter()
            .map(|r| r.name)
            .collect())
    }

    /// Open the stored map `name`, saving the current one first.
    #[tracing::instrument(skip(self))]
    pub fn open_map(&mut self, name: &str) -> FogmapResult<()> {
        let record = self
            .repo
            .load_items()?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| FogmapError::validation(format!("no map named '{name}'")))?;
        if self.doc.is_some() {
            self.persist();
        }
        self.doc = Some(MapDocument::open(
            &record,
            &self.assets,
            self.opts.surface_size,
        ));
        self.interaction.reset();
        self.surface.invalidate();
        self.publish(Redraw::Full)
    }

    /// Open document.
    pub fn document(&self) -> Option<&MapDocument> {
        self.doc.as_ref()
    }

    /// Open document, mutably. Call [`publish`](Self::publish) after changing it.
    pub fn document_mut(&mut self) -> Option<&mut MapDocument> {
        self.doc.as_mut()
    }

    /// Input state machine.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Feed one input event; repaints sinks and queues a save as needed.
    pub fn handle(&mut self, input: Input) -> FogmapResult<InputOutcome> {
        let Some(doc) = self.doc.as_mut() else {
            return Ok(InputOutcome::default());
        };
        let m = &mut self.interaction;
        let outcome = match input {
            Input::PointerDown { pos, button, mods } => m.pointer_down(doc, pos, button, mods)?,
            Input::PointerMove { pos } => m.pointer_move(doc, pos)?,
            Input::PointerUp { pos } => m.pointer_up(doc, pos)?,
            Input::PointerLeave => {
                m.pointer_left();
                InputOutcome::default()
            }
            Input::DoubleClick { pos } => m.double_click(doc, pos),
            Input::Wheel { pos, notches } => m.wheel(doc, pos, notches),
            Input::Delete => m.delete_selected(doc),
            Input::Copy => {
                m.copy_selection(doc);
                InputOutcome::default()
            }
            Input::Paste => m.paste(doc),
            Input::UndoFog => m.undo_fog(doc)?,
            Input::BringToFront => m.bring_to_front(doc),
            Input::SendToBack => m.send_to_back(doc),
            Input::Nudge(delta) => m.nudge(doc, delta),
            Input::SetTool(tool) => {
                m.set_tool(tool);
                InputOutcome::default()
            }
            Input::EditShape(id) => {
                if m.begin_graphical_edit(doc, id) {
                    InputOutcome {
                        redraw: Redraw::Overlay,
                        ..InputOutcome::default()
                    }
                } else {
                    InputOutcome::default()
                }
            }
        };
        self.apply(outcome.clone())?;

        if let Some(target) = &outcome.navigate_to {
            if let Err(e) = self.open_map(target) {
                tracing::warn!(target = %target, error = %e, "linked map not opened");
            }
        }
        Ok(outcome)
    }

    /// Apply a property edit to an item.
    pub fn edit_item(&mut self, id: ItemId, edit: ItemEdit) -> FogmapResult<bool> {
        let Some(doc) = self.doc.as_mut() else {
            return Ok(false);
        };
        if !apply_edit(&mut doc.store, id, edit)? {
            return Ok(false);
        }
        self.apply(InputOutcome {
            redraw: Redraw::Full,
            persist: true,
            navigate_to: None,
        })?;
        Ok(true)
    }

    /// Place a token for a catalog entity. `image_path` may be absolute inside the campaign.
    pub fn add_token(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        image_path: &str,
        at: Point,
    ) -> FogmapResult<ItemId> {
        let image_path = if image_path.trim().is_empty() {
            String::new()
        } else {
            campaign_relative_path(&self.opts.campaign_dir, image_path)?
        };
        let entry = self.catalog.lookup(entity_type, entity_id);
        let max_hp = entry
            .as_ref()
            .and_then(|e| e.max_hp.or(e.hp))
            .unwrap_or(DEFAULT_HP);
        let hp = entry.and_then(|e| e.hp).unwrap_or(max_hp).min(max_hp);
        let doc = self
            .doc
            .as_mut()
            .ok_or_else(|| FogmapError::validation("no map is open"))?;
        let token = Token {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            image_path,
            size: doc.token_size,
            border_color: crate::scene::item::DEFAULT_TOKEN_BORDER,
            hp,
            max_hp,
        };
        let id = doc.store.insert(SceneItem::new(at, ItemKind::Token(token))?);
        tracing::debug!(item = id.0, entity_type, entity_id, "token added");
        self.apply(InputOutcome {
            redraw: Redraw::Full,
            persist: true,
            navigate_to: None,
        })?;
        Ok(id)
    }

    /// Place a text annotation.
    pub fn add_text(&mut self, text: &str, color: Color, at: Point) -> FogmapResult<ItemId> {
        let doc = self
            .doc
            .as_mut()
            .ok_or_else(|| FogmapError::validation("no map is open"))?;
        let item = SceneItem::new(
            at,
            ItemKind::TextAnnotation(TextAnnotation {
                text: text.to_string(),
                color,
                size: DEFAULT_TEXT_SIZE,
            }),
        )?;
        let id = doc.store.insert(item);
        self.apply(InputOutcome {
            redraw: Redraw::Full,
            persist: true,
            navigate_to: None,
        })?;
        Ok(id)
    }

    /// Resize the GM surface.
    pub fn resize_surface(&mut self, width: u32, height: u32) -> FogmapResult<()> {
        self.opts.surface_size = (width.max(1), height.max(1));
        if let Some(doc) = self.doc.as_mut() {
            doc.viewport.set_size(width, height);
            doc.bump_revision();
        }
        self.publish(Redraw::Full)
    }

    /// Visible hover cards and marker descriptions.
    pub fn popups(&self) -> Vec<PopupCard> {
        let Some(doc) = self.doc.as_ref() else {
            return Vec::new();
        };
        let font_size = f64::from(doc.hover_font_size);
        doc.store
            .iter()
            .filter_map(|(id, item)| {
                let rt = doc.store.runtime(id)?;
                let b = item.bounding_box();
                match &item.kind {
                    ItemKind::Token(t) if rt.hover_visible => Some(PopupCard {
                        anchor: Point::new(b.x1 + POPUP_GAP, b.y0),
                        text: hover_text(self.catalog.as_ref(), t),
                        font_size,
                    }),
                    ItemKind::Marker(m) if rt.description_visible => Some(PopupCard {
                        anchor: Point::new(b.x0, b.y1 + POPUP_GAP / 2.0),
                        text: if m.description.trim().is_empty() {
                            m.text.clone()
                        } else {
                            m.description.clone()
                        },
                        font_size,
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    /// Everything the GM surface draws above the fog.
    pub fn decorations(&self) -> Decorations {
        let Some(doc) = self.doc.as_ref() else {
            return Decorations::default();
        };
        let mut d = self.interaction.decorations(doc);
        d.popups = self.popups();
        d
    }

    /// Publish a fresh snapshot and refresh the local sinks.
    pub fn publish(&mut self, redraw: Redraw) -> FogmapResult<()> {
        let Some(doc) = self.doc.as_ref() else {
            return Ok(());
        };
        let snap = Arc::new(doc.snapshot());
        self.cell.publish(Arc::clone(&snap));
        let decorations = self.decorations();
        self.surface.refresh(&snap, redraw, &decorations)?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.refresh(&snap, redraw, &decorations)?;
        }
        Ok(())
    }

    /// Latest snapshot handed to background renderers.
    pub fn snapshot(&self) -> Arc<DocumentSnapshot> {
        self.cell.load()
    }

    /// GM surface frame.
    pub fn surface_frame(&self) -> Option<&ComposedFrame> {
        self.surface.frame()
    }

    /// Number of full GM recomposes.
    pub fn surface_renders(&self) -> u64 {
        self.surface.full_renders()
    }

    /// Turn on the player mirror display.
    pub fn enable_mirror(&mut self) -> FogmapResult<()> {
        if self.mirror.is_none() {
            self.mirror = Some(MirrorSink::new(Arc::clone(&self.assets)));
            tracing::info!("mirror enabled");
        }
        self.publish(Redraw::Full)
    }

    /// Turn off the mirror display.
    pub fn disable_mirror(&mut self) {
        if self.mirror.take().is_some() {
            tracing::info!("mirror disabled");
        }
    }

    /// Mirror frame, when the mirror is on.
    pub fn mirror_frame(&self) -> Option<&ComposedFrame> {
        self.mirror.as_ref().and_then(|m| m.frame())
    }

    /// Start the HTTP stream; returns the bound address.
    pub fn start_stream(&mut self) -> FogmapResult<SocketAddr> {
        if let Some(s) = &self.stream {
            return Ok(s.local_addr());
        }
        let server = StreamServer::start(
            &self.opts.stream,
            self.cell.clone(),
            Arc::clone(&self.assets),
        )?;
        let addr = server.local_addr();
        self.stream = Some(server);
        Ok(addr)
    }

    /// Stop the HTTP stream.
    pub fn stop_stream(&mut self) {
        if let Some(s) = self.stream.take() {
            s.stop();
        }
    }

    /// Queue a background save of the open map.
    pub fn persist(&mut self) {
        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        let job = match PersistJob::capture(doc, &self.opts.campaign_dir) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "map snapshot failed");
                return;
            }
        };
        let mask = job.record.fog_mask_path.clone();
        match self.pipeline.persist(job) {
            Ok(()) => doc.set_fog_mask_path(mask),
            Err(FogmapError::SaveConflict(msg)) => {
                tracing::debug!(%msg, "save coalesced");
                doc.set_fog_mask_path(mask);
            }
            Err(e) => tracing::warn!(error = %e, "save not queued"),
        }
    }

    /// Save the open map now and report failures.
    pub fn save_now(&mut self) -> FogmapResult<()> {
        let doc = self
            .doc
            .as_mut()
            .ok_or_else(|| FogmapError::validation("no map is open"))?;
        let job = PersistJob::capture(doc, &self.opts.campaign_dir)?;
        let mask = job.record.fog_mask_path.clone();
        self.pipeline.save_now(job)?;
        doc.set_fog_mask_path(mask);
        Ok(())
    }

    /// Wait for background saves to finish.
    pub fn flush(&self) {
        self.pipeline.flush();
    }

    /// Persistence counters.
    pub fn persist_stats(&self) -> PersistStats {
        self.pipeline.stats()
    }

    /// End the session: stop the stream, save the open map and stop the worker.
    #[tracing::instrument(skip_all)]
    pub fn close(mut self) -> FogmapResult<()> {
        self.stop_stream();
        let saved = match self.doc.as_ref() {
            Some(_) => self.save_now(),
            None => Ok(()),
        };
        self.pipeline.shutdown();
        tracing::info!("session closed");
        saved
    }

    fn apply(&mut self, outcome: InputOutcome) -> FogmapResult<()> {
        if let Some(doc) = self.doc.as_mut()
            && matches!(outcome.redraw, Redraw::Full | Redraw::Translate(_))
        {
            doc.bump_revision();
        }
        if outcome.redraw != Redraw::None {
            self.publish(outcome.redraw)?;
        }
        if outcome.persist {
            self.persist();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/map_session.rs"]
mod tests;
