use vista_common::{MeshId, SceneUid, SoundTrackId};

/// Audio clip handle. Decoding and playback belong to the host audio layer;
/// the scene only tracks state and mesh attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub name: String,
    pub url: Option<String>,
    pub volume: f32,
    pub looping: bool,
    playing: bool,
    pub attached_mesh: Option<MeshId>,
}

impl Sound {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            volume: 1.0,
            looping: false,
            playing: false,
            attached_mesh: None,
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

#[derive(Debug, Clone)]
pub struct SoundTrack {
    pub(crate) unique_id: SoundTrackId,
    pub id: String,
    pub name: String,
    pub volume: f32,
    sounds: Vec<Sound>,
    pub(crate) scene_uid: Option<SceneUid>,
}

impl SoundTrack {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unique_id: SoundTrackId(0),
            id: name.clone(),
            name,
            volume: 1.0,
            sounds: Vec::new(),
            scene_uid: None,
        }
    }

    pub fn unique_id(&self) -> SoundTrackId {
        self.unique_id
    }

    pub fn scene_uid(&self) -> Option<SceneUid> {
        self.scene_uid
    }

    pub fn add_sound(&mut self, sound: Sound) {
        self.sounds.push(sound);
    }

    pub fn remove_sound(&mut self, name: &str) -> Option<Sound> {
        let index = self.sounds.iter().position(|s| s.name == name)?;
        Some(self.sounds.remove(index))
    }

    pub fn sounds(&self) -> &[Sound] {
        &self.sounds
    }

    pub fn sound_by_name(&self, name: &str) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.name == name)
    }

    pub fn sound_by_name_mut(&mut self, name: &str) -> Option<&mut Sound> {
        self.sounds.iter_mut().find(|s| s.name == name)
    }

    pub fn stop_all(&mut self) {
        for sound in &mut self.sounds {
            sound.stop();
        }
    }

    /// Detach and silence every sound following `mesh`.
    pub(crate) fn detach_mesh(&mut self, mesh: MeshId) {
        for sound in self.sounds.iter_mut().filter(|s| s.attached_mesh == Some(mesh)) {
            sound.attached_mesh = None;
            sound.stop();
        }
    }
}
