use std::sync::Arc;

use tokio::sync::watch;

use crate::common::{FaceResult, ObjectResult, PoseResult};

/// The only handle able to replace one feed's slice of the detection state.
///
/// Not `Clone`: each feed owns its writer, so every slice has exactly one writer.
pub struct SliceWriter<T> {
    tx: watch::Sender<Arc<[T]>>,
}

impl<T> SliceWriter<T> {
    pub fn publish(&self, results: Vec<T>) {
        self.tx.send_replace(results.into());
    }
}

/// Writers for the three detection slices, handed out once by [`DetectionState::new`].
pub struct FeedWriters {
    pub faces: SliceWriter<FaceResult>,
    pub objects: SliceWriter<ObjectResult>,
    pub poses: SliceWriter<PoseResult>,
}

/// Read side of the shared detection context. Cheap to clone.
#[derive(Clone)]
pub struct DetectionState {
    faces: watch::Receiver<Arc<[FaceResult]>>,
    objects: watch::Receiver<Arc<[ObjectResult]>>,
    poses: watch::Receiver<Arc<[PoseResult]>>,
}

impl DetectionState {
    pub fn new() -> (FeedWriters, DetectionState) {
        let (faces_tx, faces) = watch::channel(Arc::from(Vec::<FaceResult>::new()));
        let (objects_tx, objects) = watch::channel(Arc::from(Vec::<ObjectResult>::new()));
        let (poses_tx, poses) = watch::channel(Arc::from(Vec::<PoseResult>::new()));
        (
            FeedWriters {
                faces: SliceWriter { tx: faces_tx },
                objects: SliceWriter { tx: objects_tx },
                poses: SliceWriter { tx: poses_tx },
            },
            DetectionState {
                faces,
                objects,
                poses,
            },
        )
    }

    pub fn faces(&self) -> Arc<[FaceResult]> {
        self.faces.borrow().clone()
    }

    /// Latest published value of every slice. Slices are read one after another, so a feed may
    /// publish between two reads.
    pub fn snapshot(&self) -> DetectionSnapshot {
        DetectionSnapshot {
            faces: self.faces.borrow().clone(),
            objects: self.objects.borrow().clone(),
            poses: self.poses.borrow().clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionSnapshot {
    pub faces: Arc<[FaceResult]>,
    pub objects: Arc<[ObjectResult]>,
    pub poses: Arc<[PoseResult]>,
}

impl Default for DetectionSnapshot {
    fn default() -> Self {
        Self {
            faces: Arc::from(Vec::new()),
            objects: Arc::from(Vec::new()),
            poses: Arc::from(Vec::new()),
        }
    }
}

impl DetectionSnapshot {
    pub fn with_faces(mut self, faces: Vec<FaceResult>) -> Self {
        self.faces = faces.into();
        self
    }

    pub fn with_objects(mut self, objects: Vec<ObjectResult>) -> Self {
        self.objects = objects.into();
        self
    }

    pub fn with_poses(mut self, poses: Vec<PoseResult>) -> Self {
        self.poses = poses.into();
        self
    }

    pub fn primary_face(&self) -> Option<&FaceResult> {
        self.faces.first()
    }

    pub fn primary_pose(&self) -> Option<&PoseResult> {
        self.poses.first()
    }
}
