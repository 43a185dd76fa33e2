pub mod note;
pub mod object_type;
pub mod pagination;
pub mod record;
pub mod search;
pub mod typed_value;

pub use note::{Note, NoteRequest};
pub use object_type::{
    FieldDef, GrantAccessRequest, ObjectType, ObjectTypeDef, ObjectTypeRequest,
};
pub use pagination::{PageParams, Paginated};
pub use record::{
    PublicRecordDetail, Record, RecordDetail, RecordRef, RecordRequest, StepAndFunnel, Tag, Task, TypedValueView,
};
pub use search::{Headlines, MatchSource, SearchHit, SourceMatch};
pub use typed_value::{
    payload_object, payload_text, AttachValueRequest, Payload, TypedValue, UpdateValueRequest,
};
