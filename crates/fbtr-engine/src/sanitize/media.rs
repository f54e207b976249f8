//! Deferred media
//!
//! Videos and animated images arrive as placeholders that route playback
//! through tracked handlers. They are swapped for plain elements.

use fbtr_css::{closest, query_selector};
use fbtr_dom::{DomTree, ListenerOptions, NodeId, listener};
use serde::Deserialize;

use super::Sanitizer;
use super::links::strip_tracking_attributes;
use crate::classify::VideoPlaceholder;
use crate::error::{Error, Result};
use crate::guard::{self, HIDE_CLASS, SAFE_CLASS};
use crate::text::{extract_quoted_string, inline_style_property};

#[derive(Debug, Deserialize)]
struct InlineVideoStore {
    src: String,
}

/// `<video preload="metadata" controls poster width="100%" src>`, marked
/// processed so the observer leaves it alone
pub fn build_video(tree: &mut DomTree, src: &str, poster: &str) -> Result<NodeId> {
    let video = tree.create_element_with_attrs(
        "video",
        &[
            ("preload", "metadata"),
            ("controls", ""),
            ("poster", poster),
            ("width", "100%"),
            ("src", src),
        ],
    );
    guard::apply_style(tree, video)?;
    guard::mark_processed(tree, video)?;
    Ok(video)
}

/// Swap `placeholder` for a real video and start it
fn play_in_place(tree: &mut DomTree, placeholder: NodeId, src: &str, poster: &str) -> Result<NodeId> {
    let video = build_video(tree, src, poster)?;
    tree.replace_with(placeholder, video)?;
    tree.play(video)?;
    Ok(video)
}

impl Sanitizer {
    pub(crate) fn fix_video(&self, tree: &mut DomTree, vid: NodeId, placeholder: VideoPlaceholder) -> Result<bool> {
        let src = self.video_source(tree, vid, placeholder)?;
        let poster = self.video_poster(tree, vid)?;

        if self.inline_videos {
            let video = build_video(tree, &src, &poster)?;
            tree.replace_with(vid, video)?;
            tracing::info!("Inlined video {}", src);
            return Ok(true);
        }

        strip_tracking_attributes(tree, vid)?;
        let clone = tree.clone_node(vid, true)?;
        if tree.has_tag(clone, "a") {
            tree.remove_attribute(clone, "href")?;
        }
        tree.add_class(clone, SAFE_CLASS)?;
        guard::apply_style(tree, clone)?;
        guard::mark_processed(tree, clone)?;

        tree.add_event_listener(
            clone,
            "click",
            ListenerOptions::capture(),
            listener(move |tree, event| {
                event.stop_immediate_propagation();
                event.stop_propagation();
                match play_in_place(tree, clone, &src, &poster) {
                    Ok(video) => tracing::debug!("Started video {}", video),
                    Err(e) => tracing::warn!("Unable to start video: {}", e),
                }
            }),
        );
        tree.replace_with(vid, clone)?;
        tracing::debug!("Deferred video {} behind a clean placeholder", vid);
        Ok(true)
    }

    fn video_source(&self, tree: &DomTree, vid: NodeId, placeholder: VideoPlaceholder) -> Result<String> {
        match placeholder {
            VideoPlaceholder::DataStore => {
                let store = tree.get_attribute(vid, "data-store").unwrap_or_default();
                let data: InlineVideoStore =
                    serde_json::from_str(store).map_err(|source| Error::MediaData { node: vid, source })?;
                Ok(data.src)
            }
            VideoPlaceholder::RedirectAnchor => tree
                .get_attribute(vid, "href")
                .and_then(|href| self.resolve(href).ok())
                .and_then(|url| url.query_pairs().find(|(k, _)| k == "src").map(|(_, v)| v.into_owned()))
                .ok_or(Error::MissingMediaSource { node: vid }),
        }
    }

    /// Quoted URL in the preview's `background-image`, else its `src`
    fn video_poster(&self, tree: &DomTree, vid: NodeId) -> Result<String> {
        let img = query_selector(tree, vid, &self.poster_image).ok_or(Error::MissingElement {
            node: vid,
            selector: ".img,img",
        })?;
        let from_style = tree
            .get_attribute(img, "style")
            .and_then(|style| inline_style_property(style, "background-image"))
            .and_then(extract_quoted_string)
            .filter(|url| !url.is_empty());
        Ok(from_style
            .or_else(|| tree.get_attribute(img, "src"))
            .unwrap_or_default()
            .to_string())
    }

    /// Animated image behind a tracked play button: keep the still preview
    /// and the controls, and toggle between still and animated on click.
    pub(crate) fn fix_gif(&self, tree: &mut DomTree, trigger: NodeId) -> Result<bool> {
        let Some(container) = closest(tree, trigger, &self.gif_container) else {
            return Ok(false);
        };
        let preview = query_selector(tree, container, &self.gif_preview).ok_or(Error::MissingElement {
            node: container,
            selector: "img.img",
        })?;
        let controls_source = query_selector(tree, container, &self.gif_controls)
            .and_then(|c| tree.parent(c))
            .ok_or(Error::MissingElement {
                node: container,
                selector: "div._393-",
            })?;
        let animated = tree
            .parent(trigger)
            .and_then(|anchor| tree.get_attribute(anchor, "href"))
            .and_then(|href| self.resolve(href).ok())
            .map(String::from)
            .ok_or(Error::MissingMediaSource { node: trigger })?;
        let still = tree.get_attribute(preview, "src").unwrap_or_default().to_string();

        let gif = tree.clone_node(preview, false)?;
        tree.add_class(gif, SAFE_CLASS)?;
        tree.dataset_set(gif, "placeholder", &still)?;
        tree.dataset_set(gif, "src", &animated)?;

        let controls = tree.clone_node(controls_source, true)?;
        tree.add_class(controls, SAFE_CLASS)?;

        let toggle = listener(move |tree, event| {
            event.stop_immediate_propagation();
            event.stop_propagation();
            let playing = match tree.toggle_class(controls, HIDE_CLASS) {
                Ok(playing) => playing,
                Err(e) => {
                    tracing::warn!("Unable to toggle animation: {}", e);
                    return;
                }
            };
            let key = if playing { "src" } else { "placeholder" };
            let next = tree.dataset_get(gif, key).unwrap_or_default().to_string();
            if let Err(e) = tree.set_attribute(gif, "src", &next) {
                tracing::warn!("Unable to swap animation source: {}", e);
            }
        });
        tree.add_event_listener(gif, "click", ListenerOptions::capture(), toggle.clone());
        tree.add_event_listener(controls, "click", ListenerOptions::capture(), toggle);

        let wrapper = tree.create_element("div");
        if let Some(class) = tree.get_attribute(container, "class").map(str::to_string) {
            tree.set_attribute(wrapper, "class", &class)?;
        }
        tree.append_child(wrapper, gif)?;
        tree.append_child(wrapper, controls)?;
        guard::mark_processed(tree, wrapper)?;
        tree.replace_with(container, wrapper)?;
        tracing::debug!("Replaced animated image {} with a click-to-play copy", container);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_video() {
        let mut tree = DomTree::new();
        let video = build_video(&mut tree, "https://video.example/v.mp4", "https://img.example/p.jpg").unwrap();
        assert_eq!(tree.tag_name(video), Some("video"));
        assert_eq!(tree.get_attribute(video, "preload"), Some("metadata"));
        assert!(tree.has_attribute(video, "controls"));
        assert_eq!(tree.get_attribute(video, "width"), Some("100%"));
        assert_eq!(tree.get_attribute(video, "src"), Some("https://video.example/v.mp4"));
        assert!(guard::is_processed(&tree, video));
        assert!(!tree.is_playing(video));
    }
}
