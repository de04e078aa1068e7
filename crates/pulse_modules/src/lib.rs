pub mod adipose;
pub mod amygdala;
pub mod aura;
pub mod buffer;
pub mod cerebellum;
pub mod chronicle;
pub mod circadian;
pub mod dendrite;
pub mod endocrine;
pub mod enteric;
pub mod genome;
pub mod hypothalamus;
pub mod immune;
pub mod limbic;
pub mod mirror;
pub mod myelin;
pub mod nephron;
pub mod oximeter;
pub mod phenotype;
pub mod pons_rem;
pub mod proprioception;
pub mod retina;
pub mod soma;
pub mod spine;
pub mod telomere;
pub mod thymus;
pub mod vagus;
pub mod vestibular;

pub use adipose::Adipose;
pub use amygdala::Amygdala;
pub use aura::Aura;
pub use buffer::Buffer;
pub use cerebellum::Cerebellum;
pub use chronicle::Chronicle;
pub use circadian::Circadian;
pub use dendrite::Dendrite;
pub use endocrine::Endocrine;
pub use enteric::Enteric;
pub use genome::Genome;
pub use hypothalamus::Hypothalamus;
pub use immune::Immune;
pub use limbic::Limbic;
pub use mirror::Mirror;
pub use myelin::Myelin;
pub use nephron::Nephron;
pub use oximeter::Oximeter;
pub use phenotype::Phenotype;
pub use pons_rem::PonsRem;
pub use proprioception::Proprioception;
pub use retina::Retina;
pub use soma::Soma;
pub use spine::Spine;
pub use telomere::Telomere;
pub use thymus::Thymus;
pub use vagus::Vagus;
pub use vestibular::Vestibular;
